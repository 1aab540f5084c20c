//! Persisted form of a constraint instance.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sketch_types::{ObjectId, Sketch};

use crate::constants::Constants;
use crate::error::ConstraintError;

/// `{ "typeId": ..., "objects": [...], "constants": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRecord {
    pub type_id: String,
    pub objects: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: Constants,
}

impl ConstraintRecord {
    pub fn to_json(&self) -> Result<String, ConstraintError> {
        serde_json::to_string(self).map_err(|e| ConstraintError::Parse(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, ConstraintError> {
        serde_json::from_str(text).map_err(|e| ConstraintError::Parse(e.to_string()))
    }
}

/// Maps persisted object ids to live objects when records are read back.
pub trait ObjectIndex {
    fn resolve(&self, id: ObjectId) -> Option<ObjectId>;
}

/// A sketch indexes its own objects by id.
impl ObjectIndex for Sketch {
    fn resolve(&self, id: ObjectId) -> Option<ObjectId> {
        self.contains(id).then_some(id)
    }
}

impl ObjectIndex for HashMap<ObjectId, ObjectId> {
    fn resolve(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(&id).copied()
    }
}

impl ObjectIndex for BTreeMap<ObjectId, ObjectId> {
    fn resolve(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ConstantValue;

    #[test]
    fn json_uses_camel_case_type_id() {
        let record = ConstraintRecord {
            type_id: "DistancePP".into(),
            objects: vec![ObjectId(1), ObjectId(4)],
            constants: Constants::from([("distance".to_string(), ConstantValue::from("5.00"))]),
        };
        let json = record.to_json().unwrap();
        assert_eq!(json, r#"{"typeId":"DistancePP","objects":[1,4],"constants":{"distance":"5.00"}}"#);
        assert_eq!(ConstraintRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn constants_are_optional() {
        let record = ConstraintRecord::from_json(r#"{"typeId":"PCoincident","objects":[2,3]}"#).unwrap();
        assert!(record.constants.is_empty());
        assert_eq!(record.to_json().unwrap(), r#"{"typeId":"PCoincident","objects":[2,3]}"#);
    }

    #[test]
    fn mixed_constant_encodings_are_accepted() {
        let record = ConstraintRecord::from_json(
            r#"{"typeId":"DistancePL","objects":[1,2],"constants":{"distance":2.5,"inverted":true}}"#,
        )
        .unwrap();
        assert_eq!(record.constants["distance"], ConstantValue::Number(2.5));
        assert_eq!(record.constants["inverted"], ConstantValue::Flag(true));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            ConstraintRecord::from_json("{\"typeId\": 3}"),
            Err(ConstraintError::Parse(_))
        ));
    }

    #[test]
    fn remapping_index() {
        let index = HashMap::from([(ObjectId(10), ObjectId(1))]);
        assert_eq!(index.resolve(ObjectId(10)), Some(ObjectId(1)));
        assert_eq!(index.resolve(ObjectId(1)), None);
    }
}
