//! Format-agnostic document tree.
//!
//! `Node` is the interchange point between typed values and a concrete text
//! syntax. It implements serde's `Serialize`/`Deserialize`, so any serde format
//! can read or write it; mapping keys keep their insertion order.

use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

pub type Mapping = IndexMap<String, Node>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Null,
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
}

/// Shape of a node, as reported in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Null,
    String,
    Bool,
    Int,
    Float,
    Sequence,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Null => "null",
            NodeKind::String => "string",
            NodeKind::Bool => "boolean",
            NodeKind::Int => "integer",
            NodeKind::Float => "float",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ACCESSORS
// ————————————————————————————————————————————————————————————————————————————

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Null => NodeKind::Null,
            Node::Scalar(Scalar::Str(_)) => NodeKind::String,
            Node::Scalar(Scalar::Bool(_)) => NodeKind::Bool,
            Node::Scalar(Scalar::Int(_)) => NodeKind::Int,
            Node::Scalar(Scalar::Float(_)) => NodeKind::Float,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Mapping(_) => NodeKind::Mapping,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Mapping lookup; `None` for missing keys and non-mapping nodes.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    pub fn mapping<K, I>(entries: I) -> Node
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Scalar(Scalar::Str(s))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Node {
    fn from(x: f64) -> Self {
        Node::Scalar(Scalar::Float(OrderedFloat(x)))
    }
}

impl From<Vec<Node>> for Node {
    fn from(xs: Vec<Node>) -> Self {
        Node::Sequence(xs)
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Node::Mapping(m)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// serde_json BRIDGE
// ————————————————————————————————————————————————————————————————————————————

impl From<serde_json::Value> for Node {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::from(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::from(i),
                // u64 beyond i64 and real numbers both land here
                None => Node::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Node::from(s),
            Value::Array(xs) => Node::Sequence(xs.into_iter().map(Node::from).collect()),
            Value::Object(m) => Node::Mapping(m.into_iter().map(|(k, v)| (k, Node::from(v))).collect()),
        }
    }
}

impl From<&serde_json::Value> for Node {
    fn from(v: &serde_json::Value) -> Self {
        Node::from(v.clone())
    }
}

impl From<Node> for serde_json::Value {
    fn from(n: Node) -> Self {
        use serde_json::Value;
        match n {
            Node::Null => Value::Null,
            Node::Scalar(Scalar::Str(s)) => Value::String(s),
            Node::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Node::Scalar(Scalar::Int(i)) => Value::from(i),
            // non-finite floats have no JSON spelling
            Node::Scalar(Scalar::Float(x)) => serde_json::Number::from_f64(x.0)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Node::Sequence(xs) => Value::Array(xs.into_iter().map(Value::from).collect()),
            Node::Mapping(m) => Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::Value::from(self.clone());
        write!(f, "{json}")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERDE
// ————————————————————————————————————————————————————————————————————————————

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Scalar(Scalar::Str(s)) => serializer.serialize_str(s),
            Node::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Node::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Node::Scalar(Scalar::Float(x)) => serializer.serialize_f64(x.0),
            Node::Sequence(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            Node::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("null, a scalar, a sequence or a mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => Node::from(i),
            Err(_) => Node::from(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut xs = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(x) = seq.next_element::<Node>()? {
            xs.push(x);
        }
        Ok(Node::Sequence(xs))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = Mapping::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, Node>()? {
            out.insert(k, v);
        }
        Ok(Node::Mapping(out))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_bridge_keeps_key_order() {
        let v = json!({"zeta": 1, "alpha": [true, null, 2.5], "mid": "x"});
        let node = Node::from(v.clone());
        let keys: Vec<&str> = node.as_mapping().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(serde_json::Value::from(node), v);
    }

    #[test]
    fn integers_and_floats_stay_distinct() {
        assert_eq!(Node::from(json!(3)).kind(), NodeKind::Int);
        assert_eq!(Node::from(json!(3.0)).kind(), NodeKind::Float);
        // beyond i64 → float
        assert_eq!(Node::from(json!(u64::MAX)).kind(), NodeKind::Float);
    }

    #[test]
    fn serde_round_trip_through_text() {
        let src = r#"{"class":"Workflow","steps":[{"id":"a","run":"tool.cwl"}],"n":7,"f":1.5}"#;
        let node: Node = serde_json::from_str(src).unwrap();
        assert_eq!(node.get("class").and_then(Node::as_str), Some("Workflow"));
        let back = serde_json::to_string(&node).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn non_finite_floats_write_as_null() {
        let v = serde_json::Value::from(Node::from(f64::INFINITY));
        assert!(v.is_null());
    }
}
