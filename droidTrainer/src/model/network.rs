use rand::Rng;
use rayon::prelude::*;

use crate::config::constants::LAYER_NORM_EPS;
use crate::config::schema::{ObservationSchema, SchemaMismatch};

/// Identity of one parameter block in the canonical artifact order.
///
/// The runtime that consumes exported artifacts reads blocks in exactly
/// this order, so the order of `ALL` is a wire contract, not a style choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Dense1Weight,
    Dense1Bias,
    Norm1Scale,
    Norm1Bias,
    Dense2Weight,
    Dense2Bias,
    Norm2Scale,
    Norm2Bias,
    PolicyWeight,
    PolicyBias,
    ValueWeight,
    ValueBias,
}

/// Number of parameter blocks in the network.
pub const BLOCK_COUNT: usize = 12;

impl BlockId {
    /// All block identities in canonical artifact order.
    pub const ALL: [BlockId; BLOCK_COUNT] = [
        BlockId::Dense1Weight,
        BlockId::Dense1Bias,
        BlockId::Norm1Scale,
        BlockId::Norm1Bias,
        BlockId::Dense2Weight,
        BlockId::Dense2Bias,
        BlockId::Norm2Scale,
        BlockId::Norm2Bias,
        BlockId::PolicyWeight,
        BlockId::PolicyBias,
        BlockId::ValueWeight,
        BlockId::ValueBias,
    ];

    /// Stable name stored next to each block in the artifact.
    pub fn name(&self) -> &'static str {
        match self {
            BlockId::Dense1Weight => "dense1.weight",
            BlockId::Dense1Bias => "dense1.bias",
            BlockId::Norm1Scale => "norm1.scale",
            BlockId::Norm1Bias => "norm1.bias",
            BlockId::Dense2Weight => "dense2.weight",
            BlockId::Dense2Bias => "dense2.bias",
            BlockId::Norm2Scale => "norm2.scale",
            BlockId::Norm2Bias => "norm2.bias",
            BlockId::PolicyWeight => "policy_head.weight",
            BlockId::PolicyBias => "policy_head.bias",
            BlockId::ValueWeight => "value_head.weight",
            BlockId::ValueBias => "value_head.bias",
        }
    }

    pub fn from_name(name: &str) -> Option<BlockId> {
        BlockId::ALL.iter().find(|id| id.name() == name).copied()
    }
}

/// One parameter block: its identity, shape and row-major values.
#[derive(Debug, Clone)]
pub struct ParamBlock {
    id: BlockId,
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl ParamBlock {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Per-block gradients, parallel to `PolicyNetwork::blocks`.
///
/// The value head never receives gradient from the imitation loss, so its
/// two blocks stay zero and the optimizer leaves them untouched.
#[derive(Debug, Clone)]
pub struct Gradients {
    blocks: Vec<Vec<f32>>,
}

impl Gradients {
    pub(crate) fn zeros_like(network: &PolicyNetwork) -> Self {
        Self {
            blocks: network
                .blocks
                .iter()
                .map(|b| vec![0.0f32; b.data.len()])
                .collect(),
        }
    }

    pub fn blocks(&self) -> &[Vec<f32>] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.blocks
    }

    fn add_assign(&mut self, other: &Gradients) {
        for (mine, theirs) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            for (m, t) in mine.iter_mut().zip(theirs.iter()) {
                *m += *t;
            }
        }
    }

    pub(crate) fn scale(&mut self, factor: f32) {
        for block in self.blocks.iter_mut() {
            for g in block.iter_mut() {
                *g *= factor;
            }
        }
    }

    /// L2 norm over every gradient element of every block.
    pub fn global_norm(&self) -> f64 {
        let sum: f64 = self
            .blocks
            .iter()
            .flat_map(|b| b.iter())
            .map(|g| (*g as f64) * (*g as f64))
            .sum();
        sum.sqrt()
    }
}

/// Activations cached during a forward pass, kept for backprop.
struct ForwardTrace {
    z1: Vec<f32>,
    xhat1: Vec<f32>,
    sigma1: f32,
    n1: Vec<f32>,
    z2: Vec<f32>,
    xhat2: Vec<f32>,
    sigma2: f32,
    n2: Vec<f32>,
    logits: Vec<f32>,
    value: f32,
}

/// Two-layer MLP with layer normalization and separate policy/value heads.
///
/// Structure: obs -> dense -> ReLU -> norm -> dense -> ReLU -> norm, then
/// a policy head over the action space and a scalar value head. Parameters
/// live in 12 ordered blocks shared with the interchange serializer.
pub struct PolicyNetwork {
    schema: ObservationSchema,
    blocks: Vec<ParamBlock>,
}

impl PolicyNetwork {
    /// Builds a freshly initialized network for the given schema.
    ///
    /// Dense weights and biases draw from U(-1/sqrt(fan_in), 1/sqrt(fan_in));
    /// normalization blocks start at scale one, bias zero.
    pub fn new<R: Rng>(schema: ObservationSchema, rng: &mut R) -> Self {
        let obs_dim = schema.obs_dim();
        let hidden = schema.hidden_dim();
        let actions = schema.action_dim();

        let mut blocks = Vec::with_capacity(BLOCK_COUNT);
        blocks.push(Self::dense_block(BlockId::Dense1Weight, hidden, obs_dim, rng));
        blocks.push(Self::bias_block(BlockId::Dense1Bias, hidden, obs_dim, rng));
        blocks.push(Self::ones_block(BlockId::Norm1Scale, hidden));
        blocks.push(Self::zeros_block(BlockId::Norm1Bias, hidden));
        blocks.push(Self::dense_block(BlockId::Dense2Weight, hidden, hidden, rng));
        blocks.push(Self::bias_block(BlockId::Dense2Bias, hidden, hidden, rng));
        blocks.push(Self::ones_block(BlockId::Norm2Scale, hidden));
        blocks.push(Self::zeros_block(BlockId::Norm2Bias, hidden));
        blocks.push(Self::dense_block(BlockId::PolicyWeight, actions, hidden, rng));
        blocks.push(Self::bias_block(BlockId::PolicyBias, actions, hidden, rng));
        blocks.push(Self::dense_block(BlockId::ValueWeight, 1, hidden, rng));
        blocks.push(Self::bias_block(BlockId::ValueBias, 1, hidden, rng));

        Self { schema, blocks }
    }

    fn dense_block<R: Rng>(id: BlockId, out_dim: usize, in_dim: usize, rng: &mut R) -> ParamBlock {
        let bound = 1.0 / (in_dim as f32).sqrt();
        let data = (0..out_dim * in_dim)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        ParamBlock {
            id,
            shape: vec![out_dim, in_dim],
            data,
        }
    }

    fn bias_block<R: Rng>(id: BlockId, out_dim: usize, fan_in: usize, rng: &mut R) -> ParamBlock {
        let bound = 1.0 / (fan_in as f32).sqrt();
        let data = (0..out_dim).map(|_| rng.gen_range(-bound..bound)).collect();
        ParamBlock {
            id,
            shape: vec![out_dim],
            data,
        }
    }

    fn ones_block(id: BlockId, dim: usize) -> ParamBlock {
        ParamBlock {
            id,
            shape: vec![dim],
            data: vec![1.0; dim],
        }
    }

    fn zeros_block(id: BlockId, dim: usize) -> ParamBlock {
        ParamBlock {
            id,
            shape: vec![dim],
            data: vec![0.0; dim],
        }
    }

    pub fn schema(&self) -> &ObservationSchema {
        &self.schema
    }

    /// Parameter blocks in canonical artifact order.
    pub fn blocks(&self) -> &[ParamBlock] {
        &self.blocks
    }

    pub fn parameter_count(&self) -> usize {
        self.blocks.iter().map(|b| b.data.len()).sum()
    }

    /// Overwrites one block's values. The caller must have validated the
    /// length against the block's shape.
    pub(crate) fn write_block(&mut self, index: usize, data: &[f32]) {
        debug_assert_eq!(self.blocks[index].data.len(), data.len());
        self.blocks[index].data.copy_from_slice(data);
    }

    pub(crate) fn block_data_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.blocks[index].data
    }

    fn block_data(&self, id: BlockId) -> &[f32] {
        // ALL order matches construction order
        &self.blocks[id as usize].data
    }

    fn forward_trace(&self, obs: &[f32]) -> ForwardTrace {
        let hidden = self.schema.hidden_dim();
        let actions = self.schema.action_dim();

        let mut z1 = vec![0.0f32; hidden];
        linear_forward(
            self.block_data(BlockId::Dense1Weight),
            self.block_data(BlockId::Dense1Bias),
            obs,
            &mut z1,
        );
        let a1: Vec<f32> = z1.iter().map(|z| z.max(0.0)).collect();
        let (n1, xhat1, sigma1) = layer_norm_forward(
            &a1,
            self.block_data(BlockId::Norm1Scale),
            self.block_data(BlockId::Norm1Bias),
        );

        let mut z2 = vec![0.0f32; hidden];
        linear_forward(
            self.block_data(BlockId::Dense2Weight),
            self.block_data(BlockId::Dense2Bias),
            &n1,
            &mut z2,
        );
        let a2: Vec<f32> = z2.iter().map(|z| z.max(0.0)).collect();
        let (n2, xhat2, sigma2) = layer_norm_forward(
            &a2,
            self.block_data(BlockId::Norm2Scale),
            self.block_data(BlockId::Norm2Bias),
        );

        let mut logits = vec![0.0f32; actions];
        linear_forward(
            self.block_data(BlockId::PolicyWeight),
            self.block_data(BlockId::PolicyBias),
            &n2,
            &mut logits,
        );
        let mut value = [0.0f32];
        linear_forward(
            self.block_data(BlockId::ValueWeight),
            self.block_data(BlockId::ValueBias),
            &n2,
            &mut value,
        );

        ForwardTrace {
            z1,
            xhat1,
            sigma1,
            n1,
            z2,
            xhat2,
            sigma2,
            n2,
            logits,
            value: value[0],
        }
    }

    /// Evaluates the network on one observation, returning action logits
    /// and the state-value estimate.
    pub fn forward(&self, obs: &[f32]) -> Result<(Vec<f32>, f32), SchemaMismatch> {
        self.schema.check_observation(obs)?;
        let trace = self.forward_trace(obs);
        Ok((trace.logits, trace.value))
    }

    /// Arg-max action for one observation.
    pub fn act_greedy(&self, obs: &[f32]) -> Result<usize, SchemaMismatch> {
        let (logits, _) = self.forward(obs)?;
        let mut best = 0;
        for (index, logit) in logits.iter().enumerate() {
            if *logit > logits[best] {
                best = index;
            }
        }
        Ok(best)
    }

    /// Samples an action from the softmax distribution over the logits.
    pub fn act_sampled<R: Rng>(&self, obs: &[f32], rng: &mut R) -> Result<usize, SchemaMismatch> {
        let (logits, _) = self.forward(obs)?;
        let probs = softmax(&logits);
        let draw = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (index, p) in probs.iter().enumerate() {
            cumulative += *p;
            if draw < cumulative {
                return Ok(index);
            }
        }
        Ok(probs.len() - 1)
    }

    /// Average cross-entropy loss and averaged gradients over one batch.
    ///
    /// Observations must already conform to the schema; per-row validation
    /// is done once at dataset construction, not in the hot loop. Rows are
    /// processed in parallel since only the batch sum is observed.
    pub fn batch_gradients(&self, observations: &[&[f32]], labels: &[usize]) -> (f64, Gradients) {
        debug_assert_eq!(observations.len(), labels.len());
        if observations.is_empty() {
            return (0.0, Gradients::zeros_like(self));
        }

        let (loss_sum, mut grads) = observations
            .par_iter()
            .zip(labels.par_iter())
            .fold(
                || (0.0f64, Gradients::zeros_like(self)),
                |(mut loss, mut grads), (obs, label)| {
                    loss += self.accumulate_sample(obs, *label, &mut grads);
                    (loss, grads)
                },
            )
            .reduce(
                || (0.0f64, Gradients::zeros_like(self)),
                |(loss_a, mut grads_a), (loss_b, grads_b)| {
                    grads_a.add_assign(&grads_b);
                    (loss_a + loss_b, grads_a)
                },
            );

        let batch = observations.len();
        grads.scale(1.0 / batch as f32);
        (loss_sum / batch as f64, grads)
    }

    /// Runs one sample forward and backward, adding unscaled gradients.
    fn accumulate_sample(&self, obs: &[f32], label: usize, grads: &mut Gradients) -> f64 {
        let trace = self.forward_trace(obs);
        let probs = softmax(&trace.logits);
        let loss = -probs[label].max(f64::MIN_POSITIVE).ln();

        let mut dlogits: Vec<f32> = probs.iter().map(|p| *p as f32).collect();
        dlogits[label] -= 1.0;

        // Policy head
        let dn2 = linear_backward(
            self.block_data(BlockId::PolicyWeight),
            &trace.n2,
            &dlogits,
            grads.split_pair(BlockId::PolicyWeight, BlockId::PolicyBias),
        );

        // Norm 2 and ReLU 2
        let da2 = layer_norm_backward(
            &dn2,
            &trace.xhat2,
            trace.sigma2,
            self.block_data(BlockId::Norm2Scale),
            grads.split_pair(BlockId::Norm2Scale, BlockId::Norm2Bias),
        );
        let dz2: Vec<f32> = da2
            .iter()
            .zip(trace.z2.iter())
            .map(|(d, z)| if *z > 0.0 { *d } else { 0.0 })
            .collect();

        // Dense 2
        let dn1 = linear_backward(
            self.block_data(BlockId::Dense2Weight),
            &trace.n1,
            &dz2,
            grads.split_pair(BlockId::Dense2Weight, BlockId::Dense2Bias),
        );

        // Norm 1 and ReLU 1
        let da1 = layer_norm_backward(
            &dn1,
            &trace.xhat1,
            trace.sigma1,
            self.block_data(BlockId::Norm1Scale),
            grads.split_pair(BlockId::Norm1Scale, BlockId::Norm1Bias),
        );
        let dz1: Vec<f32> = da1
            .iter()
            .zip(trace.z1.iter())
            .map(|(d, z)| if *z > 0.0 { *d } else { 0.0 })
            .collect();

        // Dense 1; the input gradient is not needed
        accumulate_linear_params(
            obs,
            &dz1,
            grads.split_pair(BlockId::Dense1Weight, BlockId::Dense1Bias),
        );

        loss
    }
}

impl Gradients {
    /// Mutable access to a (weight, bias) pair of gradient blocks.
    fn split_pair(&mut self, first: BlockId, second: BlockId) -> (&mut [f32], &mut [f32]) {
        let (a, b) = (first as usize, second as usize);
        debug_assert_eq!(a + 1, b);
        let (head, tail) = self.blocks.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    }
}

/// out = W * input + b, with W row-major [out_dim, in_dim].
fn linear_forward(weight: &[f32], bias: &[f32], input: &[f32], out: &mut [f32]) {
    let in_dim = input.len();
    for (j, o) in out.iter_mut().enumerate() {
        let row = &weight[j * in_dim..(j + 1) * in_dim];
        let mut sum = bias[j];
        for (w, x) in row.iter().zip(input.iter()) {
            sum += w * x;
        }
        *o = sum;
    }
}

/// Accumulates dW and db for a linear layer and returns the input gradient.
fn linear_backward(
    weight: &[f32],
    input: &[f32],
    dout: &[f32],
    (dweight, dbias): (&mut [f32], &mut [f32]),
) -> Vec<f32> {
    let in_dim = input.len();
    let mut dinput = vec![0.0f32; in_dim];
    for (j, d) in dout.iter().enumerate() {
        dbias[j] += *d;
        if *d == 0.0 {
            continue;
        }
        let row = &weight[j * in_dim..(j + 1) * in_dim];
        let drow = &mut dweight[j * in_dim..(j + 1) * in_dim];
        for k in 0..in_dim {
            drow[k] += *d * input[k];
            dinput[k] += *d * row[k];
        }
    }
    dinput
}

/// Accumulates dW and db only, for the first layer.
fn accumulate_linear_params(input: &[f32], dout: &[f32], (dweight, dbias): (&mut [f32], &mut [f32])) {
    let in_dim = input.len();
    for (j, d) in dout.iter().enumerate() {
        dbias[j] += *d;
        if *d == 0.0 {
            continue;
        }
        let drow = &mut dweight[j * in_dim..(j + 1) * in_dim];
        for (g, x) in drow.iter_mut().zip(input.iter()) {
            *g += *d * *x;
        }
    }
}

/// Normalizes over the feature dimension: out = scale * xhat + bias with
/// xhat = (x - mean) / sqrt(var + eps). Returns (out, xhat, sigma).
fn layer_norm_forward(input: &[f32], scale: &[f32], bias: &[f32]) -> (Vec<f32>, Vec<f32>, f32) {
    let dim = input.len();
    let mean = input.iter().map(|x| *x as f64).sum::<f64>() / dim as f64;
    let var = input
        .iter()
        .map(|x| {
            let d = *x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / dim as f64;
    let sigma = (var + LAYER_NORM_EPS as f64).sqrt() as f32;

    let mut xhat = vec![0.0f32; dim];
    let mut out = vec![0.0f32; dim];
    for k in 0..dim {
        xhat[k] = (input[k] - mean as f32) / sigma;
        out[k] = scale[k] * xhat[k] + bias[k];
    }
    (out, xhat, sigma)
}

/// Backward through layer normalization. Accumulates scale/bias gradients
/// and returns the gradient with respect to the pre-norm activations.
fn layer_norm_backward(
    dout: &[f32],
    xhat: &[f32],
    sigma: f32,
    scale: &[f32],
    (dscale, dbias): (&mut [f32], &mut [f32]),
) -> Vec<f32> {
    let dim = dout.len();
    let mut dxhat = vec![0.0f32; dim];
    let mut sum_dxhat = 0.0f64;
    let mut sum_dxhat_xhat = 0.0f64;
    for k in 0..dim {
        dscale[k] += dout[k] * xhat[k];
        dbias[k] += dout[k];
        let v = dout[k] * scale[k];
        dxhat[k] = v;
        sum_dxhat += v as f64;
        sum_dxhat_xhat += (v * xhat[k]) as f64;
    }
    let mean_dxhat = (sum_dxhat / dim as f64) as f32;
    let mean_dxhat_xhat = (sum_dxhat_xhat / dim as f64) as f32;

    (0..dim)
        .map(|k| (dxhat[k] - mean_dxhat - xhat[k] * mean_dxhat_xhat) / sigma)
        .collect()
}

/// Numerically stable softmax in f64.
fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|l| ((*l as f64) - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demo_network(seed: u64) -> PolicyNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        PolicyNetwork::new(ObservationSchema::demo_v1(), &mut rng)
    }

    fn random_obs(rng: &mut StdRng, dim: usize) -> Vec<f32> {
        (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_block_layout() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = PolicyNetwork::new(ObservationSchema::heuristic_v2(), &mut rng);
        let blocks = net.blocks();
        assert_eq!(blocks.len(), BLOCK_COUNT);

        let expected: Vec<(&str, Vec<usize>)> = vec![
            ("dense1.weight", vec![256, 63]),
            ("dense1.bias", vec![256]),
            ("norm1.scale", vec![256]),
            ("norm1.bias", vec![256]),
            ("dense2.weight", vec![256, 256]),
            ("dense2.bias", vec![256]),
            ("norm2.scale", vec![256]),
            ("norm2.bias", vec![256]),
            ("policy_head.weight", vec![20, 256]),
            ("policy_head.bias", vec![20]),
            ("value_head.weight", vec![1, 256]),
            ("value_head.bias", vec![1]),
        ];
        for (block, (name, shape)) in blocks.iter().zip(expected.iter()) {
            assert_eq!(block.id().name(), *name);
            assert_eq!(block.shape(), shape.as_slice());
            let len: usize = shape.iter().product();
            assert_eq!(block.data().len(), len);
        }
    }

    #[test]
    fn test_block_id_round_trip() {
        for id in BlockId::ALL {
            assert_eq!(BlockId::from_name(id.name()), Some(id));
        }
        assert_eq!(BlockId::from_name("dense3.weight"), None);
    }

    #[test]
    fn test_initialization_ranges() {
        let net = demo_network(3);
        let bound1 = 1.0 / (40.0f32).sqrt();
        for w in net.blocks()[0].data() {
            assert!(w.abs() <= bound1);
        }
        assert!(net.blocks()[2].data().iter().all(|v| *v == 1.0));
        assert!(net.blocks()[3].data().iter().all(|v| *v == 0.0));
        let bound2 = 1.0 / (128.0f32).sqrt();
        for w in net.blocks()[8].data() {
            assert!(w.abs() <= bound2);
        }
    }

    #[test]
    fn test_forward_shapes_and_determinism() {
        let net = demo_network(4);
        let mut rng = StdRng::seed_from_u64(9);
        let obs = random_obs(&mut rng, 40);

        let (logits_a, value_a) = net.forward(&obs).unwrap();
        let (logits_b, value_b) = net.forward(&obs).unwrap();
        assert_eq!(logits_a.len(), 11);
        assert_eq!(logits_a, logits_b);
        assert_eq!(value_a, value_b);
        assert!(logits_a.iter().all(|l| l.is_finite()));
        assert!(value_a.is_finite());
    }

    #[test]
    fn test_forward_handles_zero_input() {
        let net = demo_network(5);
        let (logits, value) = net.forward(&vec![0.0; 40]).unwrap();
        assert!(logits.iter().all(|l| l.is_finite()));
        assert!(value.is_finite());
    }

    #[test]
    fn test_forward_rejects_wrong_length() {
        let net = demo_network(6);
        assert!(net.forward(&vec![0.0; 63]).is_err());
    }

    #[test]
    fn test_greedy_matches_logits_argmax() {
        let net = demo_network(7);
        let mut rng = StdRng::seed_from_u64(10);
        for _ in 0..20 {
            let obs = random_obs(&mut rng, 40);
            let (logits, _) = net.forward(&obs).unwrap();
            let best = net.act_greedy(&obs).unwrap();
            assert!(logits.iter().all(|l| *l <= logits[best]));
        }
    }

    #[test]
    fn test_sampled_actions_in_range() {
        let net = demo_network(8);
        let mut rng = StdRng::seed_from_u64(11);
        let obs = random_obs(&mut rng, 40);
        for _ in 0..200 {
            let action = net.act_sampled(&obs, &mut rng).unwrap();
            assert!(action < 11);
        }
    }

    #[test]
    fn test_value_head_gets_no_gradient() {
        let net = demo_network(12);
        let mut rng = StdRng::seed_from_u64(13);
        let obs: Vec<Vec<f32>> = (0..8).map(|_| random_obs(&mut rng, 40)).collect();
        let refs: Vec<&[f32]> = obs.iter().map(|o| o.as_slice()).collect();
        let labels = vec![2usize; 8];

        let (loss, grads) = net.batch_gradients(&refs, &labels);
        assert!(loss.is_finite() && loss > 0.0);

        // Value head blocks are positions 10 and 11
        assert!(grads.blocks()[10].iter().all(|g| *g == 0.0));
        assert!(grads.blocks()[11].iter().all(|g| *g == 0.0));
        // Policy head does learn
        assert!(grads.blocks()[9].iter().any(|g| *g != 0.0));
    }

    #[test]
    fn test_batch_loss_is_mean_of_sample_losses() {
        let net = demo_network(14);
        let mut rng = StdRng::seed_from_u64(15);
        let a = random_obs(&mut rng, 40);
        let b = random_obs(&mut rng, 40);

        let (loss_a, _) = net.batch_gradients(&[a.as_slice()], &[1]);
        let (loss_b, _) = net.batch_gradients(&[b.as_slice()], &[4]);
        let (loss_ab, _) = net.batch_gradients(&[a.as_slice(), b.as_slice()], &[1, 4]);
        assert!((loss_ab - (loss_a + loss_b) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut net = demo_network(16);
        let mut rng = StdRng::seed_from_u64(17);
        let obs = random_obs(&mut rng, 40);
        let label = 5usize;

        let (_, grads) = net.batch_gradients(&[obs.as_slice()], &[label]);

        // Check the strongest coordinate of two representative blocks
        for block_index in [9usize, 4usize] {
            let block_grads = &grads.blocks()[block_index];
            let (coord, analytic) = block_grads
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
                .map(|(i, g)| (i, *g as f64))
                .unwrap();
            assert!(analytic.abs() > 1e-4);

            let h = 1e-3f32;
            let original = net.blocks[block_index].data[coord];

            net.blocks[block_index].data[coord] = original + h;
            let (loss_plus, _) = net.batch_gradients(&[obs.as_slice()], &[label]);
            net.blocks[block_index].data[coord] = original - h;
            let (loss_minus, _) = net.batch_gradients(&[obs.as_slice()], &[label]);
            net.blocks[block_index].data[coord] = original;

            let numeric = (loss_plus - loss_minus) / (2.0 * h as f64);
            let error = (numeric - analytic).abs();
            assert!(
                error < 0.1 * analytic.abs().max(1e-3),
                "block {} coord {}: numeric {} vs analytic {}",
                block_index,
                coord,
                numeric,
                analytic
            );
        }
    }

    #[test]
    fn test_global_norm() {
        let net = demo_network(18);
        let mut grads = Gradients::zeros_like(&net);
        grads.blocks_mut()[0][0] = 3.0;
        grads.blocks_mut()[9][1] = 4.0;
        assert!((grads.global_norm() - 5.0).abs() < 1e-9);
    }
}
