//! Payload types for the tabular-data API.
//!
//! # Design
//! Only the two fields this layer interprets are typed (`Name` and
//! `Shopping List`); everything else a record carries is kept opaque in a
//! flattened map so nothing is lost on a round-trip.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const NAME_FIELD: &str = "Name";
pub const SHOPPING_LIST_FIELD: &str = "Shopping List";

/// One grocery item as stored by the tabular service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: String,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    pub fn name(&self) -> Option<&str> {
        self.fields.name.as_deref()
    }
}

/// Field values of a record.
///
/// The service omits empty fields entirely, so an unchecked shopping-list
/// box arrives as an absent key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Fields {
    /// Read as text whatever its type: numbers and booleans use their
    /// display form, formula or lookup values their compact JSON.
    #[serde(
        rename = "Name",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(rename = "Shopping List", default, skip_serializing_if = "is_false")]
    pub shopping_list: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    })
}

/// One page of a view listing. `offset` is present while more pages remain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListPage {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

/// Request body for creating records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRecords {
    pub records: Vec<NewRecord>,
}

impl CreateRecords {
    /// A single new item, always placed on the shopping list.
    pub fn shopping_item(name: &str) -> Self {
        Self {
            records: vec![NewRecord {
                fields: NewFields {
                    name: name.to_string(),
                    shopping_list: true,
                },
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRecord {
    pub fields: NewFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewFields {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Shopping List")]
    pub shopping_list: bool,
}

/// Request body for updating fields of existing records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateRecords {
    pub records: Vec<RecordUpdate>,
}

impl UpdateRecords {
    /// Change exactly one field of one record. A `None` id is serialized as
    /// `null` and left for the service to judge.
    pub fn single_field(id: Option<String>, field: &str, value: Value) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), value);
        Self {
            records: vec![RecordUpdate { id, fields }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordUpdate {
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

/// Response body of create and update calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,
}
