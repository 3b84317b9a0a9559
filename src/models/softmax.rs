use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{
        activation::softmax,
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
};

use super::LayerError;

/// Configuration for the softmax output layer
#[derive(Config, Debug)]
pub struct SoftmaxConfig {
    /// Width of the incoming features
    pub d_input: usize,

    /// Number of output classes
    pub n_classes: usize,

    /// Normalize predictions into probabilities. When disabled, prediction returns the raw
    /// logits.
    #[config(default = true)]
    pub normalize_outputs: bool,
}

impl SoftmaxConfig {
    /// Initialize a new softmax layer
    pub fn init<B: Backend>(&self, device: &B::Device) -> Softmax<B> {
        Softmax {
            linear: LinearConfig::new(self.d_input, self.n_classes).init(device),
            normalize_outputs: self.normalize_outputs,
        }
    }
}

/// A linear layer followed by a softmax over the classes
#[derive(Module, Debug)]
pub struct Softmax<B: Backend> {
    /// Projection to class logits
    pub linear: Linear<B>,

    /// Whether predictions are normalized
    pub normalize_outputs: bool,
}

impl<B: Backend> Softmax<B> {
    /// Predict class scores for a `[rows, d_input]` batch
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let logits = self.linear.forward(input);

        if self.normalize_outputs {
            softmax(logits, 1)
        } else {
            logits
        }
    }
}

impl<B: AutodiffBackend> Softmax<B> {
    /// Run the layer, keeping what is needed to backpropagate later
    pub fn begin_update(
        &self,
        input: Tensor<B, 2>,
        is_train: bool,
    ) -> (Tensor<B, 2>, SoftmaxBackprop<B>) {
        let logits = self.linear.forward(input);
        let normalized = is_train || self.normalize_outputs;

        let output = if normalized {
            softmax(logits.clone(), 1)
        } else {
            logits.clone()
        };

        (output, SoftmaxBackprop { logits, normalized })
    }
}

/// Backward value for the softmax layer
#[derive(Debug)]
pub struct SoftmaxBackprop<B: AutodiffBackend> {
    logits: Tensor<B, 2>,
    normalized: bool,
}

impl<B: AutodiffBackend> SoftmaxBackprop<B> {
    /// Backpropagate a gradient of the normalized output.
    ///
    /// The gradient is applied to the logits directly, which is exact when it comes from a
    /// categorical crossentropy against the softmax output.
    pub fn apply(
        self,
        d_output: Tensor<B::InnerBackend, 2>,
    ) -> Result<B::Gradients, LayerError> {
        if !self.normalized {
            return Err(LayerError::BackpropUnsupported);
        }

        let expected = self.logits.dims();
        let actual = d_output.dims();
        if expected != actual {
            return Err(LayerError::ShapeMismatch { expected, actual });
        }

        Ok((self.logits * Tensor::from_inner(d_output)).sum().backward())
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn inputs(device: &NdArrayDevice) -> Tensor<TestBackend, 2> {
        Tensor::from_floats(
            [
                [4.0, 2.0, 3.0, 4.0],
                [1.0, 5.0, 3.0, 1.0],
                [9.0, 8.0, 5.0, 7.0],
            ],
            device,
        )
    }

    #[test]
    fn test_unnormalized_backprop_outside_training() {
        let device = NdArrayDevice::Cpu;
        let model = SoftmaxConfig::new(4, 4)
            .with_normalize_outputs(false)
            .init::<TestBackend>(&device);

        let (outputs, backprop) = model.begin_update(inputs(&device), false);
        assert_eq!(outputs.dims(), [3, 4]);

        let err = backprop
            .apply(Tensor::zeros([3, 4], &device))
            .err()
            .unwrap();

        assert!(matches!(err, LayerError::BackpropUnsupported));
        assert!(err.to_string().contains("backprop is not supported"));
    }

    #[test]
    fn test_unnormalized_backprop_in_training() {
        let device = NdArrayDevice::Cpu;
        let model = SoftmaxConfig::new(4, 4)
            .with_normalize_outputs(false)
            .init::<TestBackend>(&device);

        let x = inputs(&device).require_grad();
        let (_, backprop) = model.begin_update(x.clone(), true);

        let grads = backprop.apply(Tensor::zeros([3, 4], &device)).unwrap();
        let d_x = x.grad(&grads).unwrap();

        assert_eq!(d_x.dims(), [3, 4]);
        let values = d_x.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_normalized_rows_sum_to_one() {
        let device = NdArrayDevice::Cpu;
        let model = SoftmaxConfig::new(4, 3).init::<TestBackend>(&device);

        let sums = model
            .forward(inputs(&device))
            .sum_dim(1)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unnormalized_predictions_keep_the_ranking() {
        let device = NdArrayDevice::Cpu;
        let normalized = SoftmaxConfig::new(4, 3).init::<TestBackend>(&device);
        let raw = Softmax {
            linear: normalized.linear.clone(),
            normalize_outputs: false,
        };

        let expected = normalized.forward(inputs(&device)).argmax(1).into_data();
        let actual = raw.forward(inputs(&device)).argmax(1).into_data();

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_backprop_shape_mismatch() {
        let device = NdArrayDevice::Cpu;
        let model = SoftmaxConfig::new(4, 4).init::<TestBackend>(&device);

        let (_, backprop) = model.begin_update(inputs(&device), true);
        let err = backprop
            .apply(Tensor::zeros([2, 4], &device))
            .err()
            .unwrap();

        assert!(matches!(err, LayerError::ShapeMismatch { .. }));
    }
}
