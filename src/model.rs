//! ネットワーク近似器。
//!
//! 座標 `[t, x, (y, z)]` を入力とし、各点の物理量ベクトルを予測する
//! 多層パーセプトロン（MLP）です。幅・深さ・活性化・初期化は設定から与えます。

use burn::module::{Ignored, Module};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation;
use serde::{Deserialize, Serialize};

use crate::config::{Activation, Initialization};

/// 最終層の後に適用する出力変換。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTransform {
    /// 濃度場など非負であるべき出力の整流
    Relu,
}

/// MLPの構成。
#[derive(Config, Debug)]
pub struct FnnConfig {
    pub input_dim: usize,
    pub output_dim: usize,
    pub num_neurons: usize,
    /// 隠れ層の数
    pub num_layers: usize,
    pub activation: Activation,
    pub initialization: Initialization,
    pub output_transform: Option<OutputTransform>,
}

impl FnnConfig {
    /// 新しいモデルを初期化します。
    pub fn init<B: Backend>(&self, device: &B::Device) -> Fnn<B> {
        let initializer = resolve_initializer(self.initialization);
        let mut linears = Vec::with_capacity(self.num_layers + 1);
        linears.push(
            LinearConfig::new(self.input_dim, self.num_neurons)
                .with_initializer(initializer.clone())
                .init(device),
        );
        for _ in 1..self.num_layers {
            linears.push(
                LinearConfig::new(self.num_neurons, self.num_neurons)
                    .with_initializer(initializer.clone())
                    .init(device),
            );
        }
        linears.push(
            LinearConfig::new(self.num_neurons, self.output_dim)
                .with_initializer(initializer)
                .init(device),
        );
        Fnn {
            linears,
            activation: Ignored(self.activation),
            output_transform: Ignored(self.output_transform),
        }
    }
}

fn resolve_initializer(init: Initialization) -> Initializer {
    match init {
        Initialization::GlorotNormal => Initializer::XavierNormal { gain: 1.0 },
        Initialization::GlorotUniform => Initializer::XavierUniform { gain: 1.0 },
        Initialization::HeNormal => Initializer::KaimingNormal {
            gain: 1.0,
            fan_out_only: false,
        },
        Initialization::HeUniform => Initializer::KaimingUniform {
            gain: 1.0,
            fan_out_only: false,
        },
    }
}

/// PINNの本体となるニューラルネットワークモデル。
#[derive(Module, Debug)]
pub struct Fnn<B: Backend> {
    linears: Vec<Linear<B>>,
    activation: Ignored<Activation>,
    output_transform: Ignored<Option<OutputTransform>>,
}

impl<B: Backend> Fnn<B> {
    /// モデルの順伝播を実行します。
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for i in 0..(self.linears.len() - 1) {
            x = self.linears[i].forward(x);
            x = self.activate(x);
        }
        let out = self.linears.last().expect("空のMLPは構築されない").forward(x);
        match self.output_transform.0 {
            Some(OutputTransform::Relu) => activation::relu(out),
            None => out,
        }
    }

    fn activate(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self.activation.0 {
            Activation::Tanh => activation::tanh(x),
            Activation::Relu => activation::relu(x),
            Activation::Gelu => activation::gelu(x),
            Activation::Sigmoid => activation::sigmoid(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn config(input: usize, output: usize) -> FnnConfig {
        FnnConfig::new(
            input,
            output,
            8,
            3,
            Activation::Tanh,
            Initialization::GlorotNormal,
        )
    }

    #[test]
    fn forward_produces_requested_output_shape() {
        let device = Default::default();
        let model = config(3, 2).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 2>::zeros([17, 3], &device);
        assert_eq!(model.forward(input).dims(), [17, 2]);
    }

    #[test]
    fn relu_transform_makes_outputs_non_negative() {
        let device = Default::default();
        let model = config(2, 1)
            .with_output_transform(Some(OutputTransform::Relu))
            .init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 2>::random(
            [64, 2],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let out: Vec<f32> = model.forward(input).into_data().to_vec().unwrap();
        assert!(out.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn every_activation_runs() {
        let device = Default::default();
        for act in [
            Activation::Tanh,
            Activation::Relu,
            Activation::Gelu,
            Activation::Sigmoid,
        ] {
            let model = FnnConfig::new(2, 1, 4, 2, act, Initialization::HeUniform)
                .init::<TestBackend>(&device);
            let input = Tensor::<TestBackend, 2>::ones([5, 2], &device);
            assert_eq!(model.forward(input).dims(), [5, 1]);
        }
    }
}
