//! Minimal XML-RPC codec
//!
//! Covers the subset of XML-RPC the zone API speaks: scalar values,
//! structs, arrays, `<nil/>`, method calls and method responses (including
//! faults). Requests are written directly; responses are parsed into a
//! small element tree with `quick-xml` and then read as values.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fmt::Write;
use thiserror::Error;

/// Errors reading an XML-RPC response
#[derive(Debug, Error, PartialEq)]
pub enum XmlRpcError {
    /// The body is not a well-formed method response
    #[error("malformed XML-RPC response: {0}")]
    Malformed(String),

    /// The server answered with a `<fault>`
    #[error("fault {code}: {message}")]
    Fault {
        /// `faultCode`
        code: i64,
        /// `faultString`
        message: String,
    },
}

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    /// Build a struct value from `(name, value)` pairs
    pub fn structure<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a struct member
    pub fn get(&self, member: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(member),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Serialize a `<methodCall>` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            let _ = write!(out, "<int>{}</int>", i);
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Parse a `<methodResponse>` document into its single return value
///
/// A `<fault>` response becomes [`XmlRpcError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, XmlRpcError> {
    let document = parse_tree(xml)?;
    let response = document
        .child("methodResponse")
        .ok_or_else(|| malformed("missing <methodResponse>"))?;

    if let Some(fault) = response.child("fault") {
        let value = decode_value(
            fault
                .child("value")
                .ok_or_else(|| malformed("empty <fault>"))?,
        )?;
        return Err(XmlRpcError::Fault {
            code: value.get("faultCode").and_then(Value::as_i64).unwrap_or(0),
            message: value
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    let value = response
        .child("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
        .ok_or_else(|| malformed("missing <params><param><value>"))?;
    decode_value(value)
}

fn malformed(msg: impl Into<String>) -> XmlRpcError {
    XmlRpcError::Malformed(msg.into())
}

/// Element with its children and concatenated text
#[derive(Debug)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn parse_tree(xml: &str) -> Result<Node, XmlRpcError> {
    // Text is kept verbatim so string values keep their whitespace. Text
    // between container elements is collected but never read.
    let mut reader = Reader::from_str(xml);

    let mut stack = vec![Node::new(String::new())];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(Node::new(name));
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                top(&mut stack)?.children.push(Node::new(name));
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| malformed("unbalanced end tag"))?;
                top(&mut stack)?.children.push(node);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                top(&mut stack)?.text.push_str(&text);
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                top(&mut stack)?
                    .text
                    .push_str(&String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match stack.pop() {
        Some(document) if stack.is_empty() => Ok(document),
        _ => Err(malformed("unexpected end of document")),
    }
}

fn top(stack: &mut [Node]) -> Result<&mut Node, XmlRpcError> {
    stack
        .last_mut()
        .ok_or_else(|| malformed("unbalanced end tag"))
}

fn decode_value(node: &Node) -> Result<Value, XmlRpcError> {
    // An untyped <value> holds a string
    let Some(typed) = node.children.first() else {
        return Ok(Value::String(node.text.clone()));
    };
    let text = typed.text.trim();

    match typed.name.as_str() {
        "int" | "i4" | "i8" => text
            .parse()
            .map(Value::Int)
            .map_err(|_| malformed(format!("bad integer {:?}", text))),
        "boolean" => match text {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(malformed(format!("bad boolean {:?}", other))),
        },
        "double" => text
            .parse()
            .map(Value::Double)
            .map_err(|_| malformed(format!("bad double {:?}", text))),
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(typed.text.clone())),
        "nil" => Ok(Value::Nil),
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children_named("member") {
                let name = member
                    .child("name")
                    .ok_or_else(|| malformed("struct member without <name>"))?;
                let value = member
                    .child("value")
                    .ok_or_else(|| malformed("struct member without <value>"))?;
                members.insert(name.text.trim().to_string(), decode_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        "array" => {
            let data = typed
                .child("data")
                .ok_or_else(|| malformed("array without <data>"))?;
            data.children_named("value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        other => Err(malformed(format!("unknown value type <{}>", other))),
    }
}
