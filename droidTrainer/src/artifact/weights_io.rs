use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::path::Path;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::schema::SchemaMismatch;
use crate::model::network::{BlockId, PolicyNetwork, BLOCK_COUNT};
use crate::training::session::TrainingSession;

/// Element type tag written for every block.
pub const DTYPE_F32: &str = "float32";

lazy_static! {
    /// Serializes artifact file access across threads
    static ref FILE_MUTEX: Mutex<()> = Mutex::new(());
}

/// One serialized parameter block.
///
/// `name` identifies the block independently of its position; artifacts
/// written by older exporters may not carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub data: Vec<f32>,
}

/// Complete on-disk training artifact.
///
/// The block list is ordered: position 0..11 is dense1 weight/bias, norm1
/// scale/bias, dense2 weight/bias, norm2 scale/bias, policy head
/// weight/bias, value head weight/bias. Consumers that ignore block names
/// rely on exactly this order. Every metadata field has a default so an
/// artifact from any prior exporter version still parses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub weights: Vec<WeightBlock>,
    pub obs_dim: usize,
    pub action_dim: usize,
    #[serde(default)]
    pub episode: u64,
    #[serde(rename = "bestScore", default)]
    pub best_score: f64,
    #[serde(default)]
    pub pretrained: bool,
    #[serde(default)]
    pub training_epochs: u64,
    #[serde(default)]
    pub best_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<String>,
}

/// Snapshots a network and its session state into an artifact.
pub fn build_artifact(network: &PolicyNetwork, session: &TrainingSession) -> ModelArtifact {
    let weights = network
        .blocks()
        .iter()
        .map(|block| WeightBlock {
            name: Some(block.id().name().to_string()),
            shape: block.shape().to_vec(),
            dtype: DTYPE_F32.to_string(),
            data: block.data().to_vec(),
        })
        .collect();

    ModelArtifact {
        weights,
        obs_dim: network.schema().obs_dim(),
        action_dim: network.schema().action_dim(),
        episode: session.episode(),
        best_score: session.best_score(),
        pretrained: true,
        training_epochs: session.cumulative_epochs(),
        best_loss: session.best_loss(),
        resumed_from: session.resumed_from().map(|s| s.to_string()),
    }
}

/// Writes an artifact to disk as compact JSON.
pub fn save_to_file(artifact: &ModelArtifact, path: &Path) -> io::Result<()> {
    let _guard = FILE_MUTEX.lock();
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, artifact).map_err(|e| {
        io::Error::new(
            ErrorKind::Other,
            format!("Failed to serialize model artifact: {}", e),
        )
    })
}

/// Reads an artifact from disk.
pub fn load_from_file(path: &Path) -> io::Result<ModelArtifact> {
    let _guard = FILE_MUTEX.lock();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("Failed to parse model artifact: {}", e),
        )
    })
}

/// Restores every parameter block of an artifact into the network.
///
/// Dimensions are checked against the network's schema first. Blocks map by
/// name when all of them are named, otherwise strictly by position. The
/// restore is all-or-nothing: any mismatch leaves the network untouched.
pub fn restore_into(
    network: &mut PolicyNetwork,
    artifact: &ModelArtifact,
) -> Result<(), SchemaMismatch> {
    network
        .schema()
        .check_dims(artifact.obs_dim, artifact.action_dim)?;

    if artifact.weights.len() != BLOCK_COUNT {
        return Err(SchemaMismatch::BlockCount {
            expected: BLOCK_COUNT,
            found: artifact.weights.len(),
        });
    }

    let ordered = canonical_order(artifact)?;

    // Validate every block before touching any parameter
    for (index, source) in ordered.iter().enumerate() {
        let target = &network.blocks()[index];
        let name = target.id().name();
        if source.shape.as_slice() != target.shape() {
            return Err(SchemaMismatch::BlockShape {
                name: name.to_string(),
                expected: target.shape().to_vec(),
                found: source.shape.clone(),
            });
        }
        if source.data.len() != target.data().len() {
            return Err(SchemaMismatch::BlockLength {
                name: name.to_string(),
                expected: target.data().len(),
                found: source.data.len(),
            });
        }
    }

    for (index, source) in ordered.iter().enumerate() {
        network.write_block(index, &source.data);
    }
    Ok(())
}

/// Arranges the artifact's blocks into canonical order.
///
/// When every block carries a name, names decide placement and must form
/// the exact known set. Otherwise the stored order is taken as canonical.
fn canonical_order(artifact: &ModelArtifact) -> Result<Vec<&WeightBlock>, SchemaMismatch> {
    let named: Vec<(&str, &WeightBlock)> = artifact
        .weights
        .iter()
        .filter_map(|w| w.name.as_deref().map(|n| (n, w)))
        .collect();

    if named.len() != artifact.weights.len() {
        return Ok(artifact.weights.iter().collect());
    }

    let mut slots: Vec<Option<&WeightBlock>> = vec![None; BLOCK_COUNT];
    for (name, block) in named {
        let id = BlockId::from_name(name)
            .ok_or_else(|| SchemaMismatch::UnknownBlockName(name.to_string()))?;
        let slot = &mut slots[id as usize];
        if slot.is_some() {
            return Err(SchemaMismatch::DuplicateBlockName(name.to_string()));
        }
        *slot = Some(block);
    }

    // Twelve blocks with distinct known names fill every slot
    let ordered: Vec<&WeightBlock> = slots.into_iter().flatten().collect();
    debug_assert_eq!(ordered.len(), BLOCK_COUNT);
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ObservationSchema;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network(seed: u64) -> PolicyNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        PolicyNetwork::new(ObservationSchema::heuristic_v2(), &mut rng)
    }

    fn assert_same_parameters(a: &PolicyNetwork, b: &PolicyNetwork) {
        for (block_a, block_b) in a.blocks().iter().zip(b.blocks().iter()) {
            assert_eq!(block_a.shape(), block_b.shape());
            assert_eq!(block_a.data(), block_b.data());
        }
    }

    #[test]
    fn test_artifact_block_order_and_tags() {
        let net = network(1);
        let artifact = build_artifact(&net, &TrainingSession::fresh());
        assert_eq!(artifact.weights.len(), 12);
        assert_eq!(artifact.obs_dim, 63);
        assert_eq!(artifact.action_dim, 20);

        let names: Vec<&str> = artifact
            .weights
            .iter()
            .map(|w| w.name.as_deref().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "dense1.weight",
                "dense1.bias",
                "norm1.scale",
                "norm1.bias",
                "dense2.weight",
                "dense2.bias",
                "norm2.scale",
                "norm2.bias",
                "policy_head.weight",
                "policy_head.bias",
                "value_head.weight",
                "value_head.bias"
            ]
        );
        assert!(artifact.weights.iter().all(|w| w.dtype == DTYPE_F32));
        assert_eq!(artifact.weights[0].shape, vec![256, 63]);
        assert_eq!(artifact.weights[0].data.len(), 256 * 63);
    }

    #[test]
    fn test_fresh_metadata_defaults() {
        let net = network(2);
        let artifact = build_artifact(&net, &TrainingSession::fresh());
        assert_eq!(artifact.episode, 0);
        assert_eq!(artifact.best_score, 0.0);
        assert!(artifact.pretrained);
        assert_eq!(artifact.training_epochs, 0);
        assert_eq!(artifact.best_loss, None);
        assert_eq!(artifact.resumed_from, None);

        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"bestScore\":"));
        assert!(!json.contains("resumed_from"));
    }

    #[test]
    fn test_file_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let source = network(3);
        let mut session = TrainingSession::fresh();
        session.observe_epoch(0.321);
        save_to_file(&build_artifact(&source, &session), &path).unwrap();

        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded.training_epochs, 1);
        assert_eq!(loaded.best_loss, Some(0.321));

        let mut target = network(4);
        restore_into(&mut target, &loaded).unwrap();
        assert_same_parameters(&source, &target);
    }

    #[test]
    fn test_restore_by_name_survives_reordering() {
        let source = network(5);
        let mut artifact = build_artifact(&source, &TrainingSession::fresh());
        artifact.weights.reverse();

        let mut target = network(6);
        restore_into(&mut target, &artifact).unwrap();
        assert_same_parameters(&source, &target);
    }

    #[test]
    fn test_restore_falls_back_to_position_without_names() {
        let source = network(7);
        let mut artifact = build_artifact(&source, &TrainingSession::fresh());
        for block in artifact.weights.iter_mut() {
            block.name = None;
        }

        let mut target = network(8);
        restore_into(&mut target, &artifact).unwrap();
        assert_same_parameters(&source, &target);
    }

    #[test]
    fn test_restore_rejects_wrong_dimensions() {
        let mut rng = StdRng::seed_from_u64(9);
        let demo = PolicyNetwork::new(ObservationSchema::demo_v1(), &mut rng);
        let artifact = build_artifact(&demo, &TrainingSession::fresh());

        let mut target = network(10);
        let err = restore_into(&mut target, &artifact).unwrap_err();
        assert!(matches!(err, SchemaMismatch::Dimensions { .. }));
    }

    #[test]
    fn test_restore_rejects_missing_block() {
        let source = network(11);
        let mut artifact = build_artifact(&source, &TrainingSession::fresh());
        artifact.weights.pop();

        let mut target = network(12);
        let err = restore_into(&mut target, &artifact).unwrap_err();
        assert_eq!(
            err,
            SchemaMismatch::BlockCount {
                expected: 12,
                found: 11
            }
        );
    }

    #[test]
    fn test_restore_is_all_or_nothing() {
        let source = network(13);
        let mut artifact = build_artifact(&source, &TrainingSession::fresh());
        // Corrupt the last block so validation fails after 11 good ones
        artifact.weights[11].data.push(0.0);

        let mut target = network(14);
        let before: Vec<Vec<f32>> = target.blocks().iter().map(|b| b.data().to_vec()).collect();
        let err = restore_into(&mut target, &artifact).unwrap_err();
        assert!(matches!(err, SchemaMismatch::BlockLength { .. }));
        for (block, original) in target.blocks().iter().zip(before.iter()) {
            assert_eq!(block.data(), original.as_slice());
        }
    }

    #[test]
    fn test_restore_rejects_foreign_block_name() {
        let source = network(15);
        let mut artifact = build_artifact(&source, &TrainingSession::fresh());
        artifact.weights[0].name = Some("dense9.weight".to_string());

        let mut target = network(16);
        let err = restore_into(&mut target, &artifact).unwrap_err();
        assert_eq!(
            err,
            SchemaMismatch::UnknownBlockName("dense9.weight".to_string())
        );
    }

    #[test]
    fn test_restore_rejects_reshaped_block() {
        let source = network(17);
        let mut artifact = build_artifact(&source, &TrainingSession::fresh());
        artifact.weights[8].shape = vec![10, 512];

        let mut target = network(18);
        let err = restore_into(&mut target, &artifact).unwrap_err();
        assert!(matches!(err, SchemaMismatch::BlockShape { .. }));
    }

    #[test]
    fn test_metadata_fields_all_have_defaults() {
        let net = network(19);
        let artifact = build_artifact(&net, &TrainingSession::fresh());
        let mut value = serde_json::to_value(&artifact).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("episode");
        object.remove("bestScore");
        object.remove("pretrained");
        object.remove("training_epochs");
        object.remove("best_loss");

        let reparsed: ModelArtifact = serde_json::from_value(value).unwrap();
        assert_eq!(reparsed.episode, 0);
        assert_eq!(reparsed.best_score, 0.0);
        assert!(!reparsed.pretrained);
        assert_eq!(reparsed.training_epochs, 0);
        assert_eq!(reparsed.best_loss, None);
        assert_eq!(reparsed.resumed_from, None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_file(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_resumed_session_metadata_carries_through() {
        let net = network(20);
        let mut session =
            TrainingSession::resumed(40, Some(0.5), 12, 2200.0, "prior.json".to_string());
        session.observe_epoch(0.45);
        session.observe_epoch(0.48);

        let artifact = build_artifact(&net, &session);
        assert_eq!(artifact.episode, 12);
        assert_eq!(artifact.best_score, 2200.0);
        assert_eq!(artifact.training_epochs, 42);
        assert_eq!(artifact.best_loss, Some(0.45));
        assert_eq!(artifact.resumed_from.as_deref(), Some("prior.json"));

        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"resumed_from\":\"prior.json\""));
    }
}
