//! The `.meta` file written next to a checkpoint: a `MetaGraphDef` carrying
//! the saver configuration and the collection of saved variables.

use prost::Message;

use crate::error::Result;
use crate::proto::tensorflow as pb;
use crate::proto::tensorflow::collection_def::{BytesList, Kind};

pub const VARIABLES_COLLECTION: &str = "variables";
pub const TRAINABLE_VARIABLES_COLLECTION: &str = "trainable_variables";

const META_GRAPH_VERSION: &str = concat!("rust:", env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub fn variable_def(name: &str) -> pb::VariableDef {
    let mut def = pb::VariableDef::default();
    def.variable_name = format!("{}:0", name);
    def.initializer_name = format!("{}/Assign", name);
    def.snapshot_name = format!("{}/read:0", name);
    def.initial_value_name = format!("{}/Initializer/zeros:0", name);
    def.trainable = true;
    def
}

pub fn saver_def(max_to_keep: usize) -> pb::SaverDef {
    let mut def = pb::SaverDef::default();
    def.filename_tensor_name = "save/Const:0".to_string();
    def.save_tensor_name = "save/control_dependency:0".to_string();
    def.restore_op_name = "save/restore_all".to_string();
    def.max_to_keep = i32::try_from(max_to_keep).unwrap_or(i32::MAX);
    def.keep_checkpoint_every_n_hours = 10000.0;
    def.set_version(pb::saver_def::CheckpointFormatVersion::V2);
    def
}

/// Builds the meta graph for a checkpoint holding `names`.
pub fn build<'a, I>(names: I, max_to_keep: usize) -> pb::MetaGraphDef
where
    I: IntoIterator<Item = &'a str>,
{
    let defs: Vec<Vec<u8>> = names
        .into_iter()
        .map(|name| variable_def(name).encode_to_vec())
        .collect();
    let collection = pb::CollectionDef {
        kind: Some(Kind::BytesList(BytesList { value: defs })),
    };

    let mut info = pb::meta_graph_def::MetaInfoDef::default();
    info.meta_graph_version = META_GRAPH_VERSION.to_string();

    let mut meta = pb::MetaGraphDef::default();
    meta.meta_info_def = Some(info);
    meta.saver_def = Some(saver_def(max_to_keep));
    meta.collection_def
        .insert(VARIABLES_COLLECTION.to_string(), collection.clone());
    meta.collection_def
        .insert(TRAINABLE_VARIABLES_COLLECTION.to_string(), collection);
    meta
}

pub fn encode(meta: &pb::MetaGraphDef) -> Vec<u8> {
    meta.encode_to_vec()
}

pub fn decode(bytes: &[u8]) -> Result<pb::MetaGraphDef> {
    Ok(pb::MetaGraphDef::decode(bytes)?)
}

/// Sorted names of the variables in the `variables` collection, without the
/// `:0` output suffix.
pub fn variable_names(meta: &pb::MetaGraphDef) -> Result<Vec<String>> {
    let values = match meta
        .collection_def
        .get(VARIABLES_COLLECTION)
        .and_then(|c| c.kind.as_ref())
    {
        Some(Kind::BytesList(list)) => &list.value,
        _ => return Ok(Vec::new()),
    };
    let mut names = Vec::with_capacity(values.len());
    for bytes in values {
        let def = pb::VariableDef::decode(bytes.as_slice())?;
        let name = match def.variable_name.rsplit_once(':') {
            Some((name, _)) => name.to_string(),
            None => def.variable_name,
        };
        names.push(name);
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_names_round_trip() {
        let meta = build(vec!["var3", "var1", "var2"], 5);
        let decoded = decode(&encode(&meta)).unwrap();
        assert_eq!(
            variable_names(&decoded).unwrap(),
            vec!["var1", "var2", "var3"]
        );
        let saver = decoded.saver_def.unwrap();
        assert_eq!(saver.version(), pb::saver_def::CheckpointFormatVersion::V2);
        assert_eq!(saver.max_to_keep, 5);
        assert!(decoded
            .collection_def
            .contains_key(TRAINABLE_VARIABLES_COLLECTION));
    }

    #[test]
    fn test_scoped_names_keep_their_scope() {
        let def = variable_def("layer1/kernel");
        assert_eq!(def.variable_name, "layer1/kernel:0");
        let meta = build(vec!["layer1/kernel"], 0);
        assert_eq!(variable_names(&meta).unwrap(), vec!["layer1/kernel"]);
    }

    #[test]
    fn test_huge_max_to_keep_saturates() {
        assert_eq!(saver_def(usize::MAX).max_to_keep, i32::MAX);
        assert_eq!(saver_def(3).max_to_keep, 3);
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let meta = pb::MetaGraphDef::default();
        assert!(variable_names(&meta).unwrap().is_empty());
    }
}
