//! Decoding of untyped cluster objects into typed resources
//!
//! Objects arrive from the cluster store as `DynamicObject`s. Decoding goes
//! through the serialized byte form so the typed structs only depend on the
//! JSON shape, never on how the generic object is held in memory.

use kube::api::DynamicObject;
use serde::de::DeserializeOwned;

use crate::crd::HasApiResource;
use crate::Error;

/// Parse a serialized object into `T`, naming `kind` in any failure
pub fn decode_bytes<T: DeserializeOwned>(kind: &str, bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| Error::decode(kind, e.to_string()))
}

/// Decode an untyped cluster object into its typed resource
pub fn decode_object<T>(obj: &DynamicObject) -> Result<T, Error>
where
    T: DeserializeOwned + HasApiResource,
{
    let bytes = serde_json::to_vec(obj)
        .map_err(|e| Error::decode(T::KIND, format!("failed to serialize object: {e}")))?;
    decode_bytes(T::KIND, &bytes)
}
