use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::ai::state_encoding::CHANNELS;
use crate::game::{COLS, ROWS};

/// Convolutional Q-network for Connect Four.
///
/// ```text
/// Input:  [batch, 2, 6, 7]
/// Conv1:  2 -> 16 channels, 3x3 kernel, padding 1  =>  [batch, 16, 6, 7]
/// ReLU
/// Conv2:  16 -> 16 channels, 3x3 kernel, padding 1 =>  [batch, 16, 6, 7]
/// ReLU
/// Flatten: 16*6*7 = 672
/// FC1:    672 -> 128, ReLU
/// FC2:    128 -> 7  (Q-values, one per column)
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    #[config(default = 16)]
    pub channels: usize,
    #[config(default = 128)]
    pub hidden: usize,
}

impl QNetworkConfig {
    /// Weights start from a Xavier-uniform draw.
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let init = Initializer::XavierUniform { gain: 1.0 };
        QNetwork {
            conv1: Conv2dConfig::new([CHANNELS, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(init.clone())
                .init(device),
            conv2: Conv2dConfig::new([self.channels, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(init.clone())
                .init(device),
            fc1: LinearConfig::new(self.flat_features(), self.hidden)
                .with_initializer(init.clone())
                .init(device),
            fc2: LinearConfig::new(self.hidden, COLS)
                .with_initializer(init)
                .init(device),
            relu: Relu::new(),
        }
    }

    fn flat_features(&self) -> usize {
        self.channels * ROWS * COLS
    }
}

impl<B: Backend> QNetwork<B> {
    /// Name used in model identifiers and export manifests.
    pub const NAME: &'static str = "QNetwork";

    /// Forward pass: input [batch, 2, 6, 7] -> output [batch, 7] Q-values.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = input.dims();

        let x = self.relu.forward(self.conv1.forward(input));
        let x = self.relu.forward(self.conv2.forward(x));
        let [_, channels, rows, cols] = x.dims();
        let x = x.reshape([batch_size, channels * rows * cols]);
        let x = self.relu.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_network_output_shape() {
        let device = Default::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        let input = Tensor::zeros([3, 2, 6, 7], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [3, 7]);
    }

    #[test]
    fn test_network_single_input() {
        let device = Default::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        let input = Tensor::zeros([1, 2, 6, 7], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [1, 7]);
    }

    #[test]
    fn test_custom_widths() {
        let device = Default::default();
        let config = QNetworkConfig::new().with_channels(4).with_hidden(32);
        assert_eq!(config.flat_features(), 4 * 42);
        let network = config.init::<TestBackend>(&device);
        let output = network.forward(Tensor::zeros([2, 2, 6, 7], &device));
        assert_eq!(output.shape().dims, [2, 7]);
    }
}
