use burn::tensor::{backend::Backend, Int, Tensor, TensorData};

/// Generation padding to a specific max length, typically to correlate with tokenzed sequences
pub fn pad_to<B: Backend>(
    pad_token: usize,
    tokens_list: Vec<Vec<usize>>,
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = tokens_list.len();

    let mut tensor = Tensor::zeros([batch_size, seq_length], device);
    tensor = tensor.add_scalar(pad_token as i64);

    for (index, tokens) in tokens_list.into_iter().enumerate() {
        let length = usize::min(tokens.len(), seq_length);
        if length == 0 {
            continue;
        }

        let values: Vec<i64> = tokens.into_iter().take(length).map(|e| e as i64).collect();

        tensor = tensor.slice_assign(
            [index..index + 1, 0..length],
            Tensor::from_data(
                TensorData::new(values, [1, length]).convert::<B::IntElem>(),
                device,
            ),
        );
    }

    tensor
}

/// Zero-pad a list of `[length, width]` tensors into one `[batch_size, seq_length, width]` tensor.
/// Every item must share the same width and be no longer than `seq_length`.
pub fn pad<B: Backend>(seqs: Vec<Tensor<B, 2>>, seq_length: usize) -> Tensor<B, 3> {
    let Some(first) = seqs.first() else {
        return Tensor::zeros([0, seq_length, 0], &B::Device::default());
    };

    let [_, width] = first.dims();
    let device = first.device();
    let batch_size = seqs.len();

    let mut tensor = Tensor::zeros([batch_size, seq_length, width], &device);

    for (index, seq) in seqs.into_iter().enumerate() {
        let [length, _] = seq.dims();
        if length == 0 {
            continue;
        }

        tensor = tensor.slice_assign(
            [index..index + 1, 0..length, 0..width],
            seq.unsqueeze::<3>(),
        );
    }

    tensor
}

/// Concatenate the rows of every item into a single `[total_rows, width]` tensor.
/// Returns `None` when there are no rows at all.
pub fn flatten<B: Backend>(seqs: Vec<Tensor<B, 2>>) -> Option<Tensor<B, 2>> {
    let seqs: Vec<_> = seqs.into_iter().filter(|s| s.dims()[0] > 0).collect();

    if seqs.is_empty() {
        return None;
    }

    Some(Tensor::cat(seqs, 0))
}

/// Split a `[total_rows, width]` tensor back into items with the given row counts
pub fn unflatten<B: Backend>(flat: Tensor<B, 2>, lengths: &[usize]) -> Vec<Tensor<B, 2>> {
    let [_, width] = flat.dims();

    let mut start = 0;
    lengths
        .iter()
        .map(|&length| {
            let item = flat.clone().slice([start..start + length, 0..width]);
            start += length;

            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_pad_to() {
        let device = NdArrayDevice::Cpu;

        let tensor = pad_to::<TestBackend>(0, vec![vec![101, 7, 102], vec![101, 102]], 4, &device);

        let values = tensor.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(values, vec![101, 7, 102, 0, 101, 102, 0, 0]);
    }

    #[test]
    fn test_pad_fills_with_zeros() {
        let device = NdArrayDevice::Cpu;
        let a = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0]], &device);
        let b = Tensor::<TestBackend, 2>::from_floats([[3.0, 4.0], [5.0, 6.0]], &device);

        let padded = pad(vec![a, b], 3);

        assert_eq!(padded.dims(), [2, 3, 2]);
        padded.to_data().assert_eq(
            &TensorData::from([
                [[1.0, 2.0], [0.0, 0.0], [0.0, 0.0]],
                [[3.0, 4.0], [5.0, 6.0], [0.0, 0.0]],
            ]),
            false,
        );
    }

    #[test]
    fn test_flatten_and_unflatten() {
        let device = NdArrayDevice::Cpu;
        let a = Tensor::<TestBackend, 2>::from_floats([[1.0], [2.0]], &device);
        let empty = Tensor::<TestBackend, 2>::zeros([0, 1], &device);
        let b = Tensor::<TestBackend, 2>::from_floats([[3.0]], &device);

        let flat = flatten(vec![a, empty, b]).unwrap();
        assert_eq!(flat.dims(), [3, 1]);

        let items = unflatten(flat, &[2, 0, 1]);
        let dims: Vec<_> = items.iter().map(|i| i.dims()).collect();
        assert_eq!(dims, vec![[2, 1], [0, 1], [1, 1]]);
        items[2].to_data().assert_eq(&TensorData::from([[3.0]]), false);
    }

    #[test]
    fn test_flatten_without_rows() {
        let device = NdArrayDevice::Cpu;
        let empty = Tensor::<TestBackend, 2>::zeros([0, 4], &device);

        assert!(flatten(vec![empty]).is_none());
    }
}
