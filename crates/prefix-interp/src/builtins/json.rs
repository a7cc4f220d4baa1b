// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `SER`/`UNSER`: structural JSON encode/decode of runtime values with
//! identity sharing for repeated tensor/map references within one call.
//!
//! Hand-rolled rather than pulled in from a JSON crate — the wire format
//! is bespoke (`{t,v}`-tagged, id/ref sharing scheme) and small enough that
//! a dependency would buy little beyond what `std` already gives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::{Closure, MapKey, PrefixMap, Tensor, Value};

use super::{eval_positional, Registry};

/// Closures carry a body (`Vec<Stmt>`) and a captured environment, neither
/// of which this hand-rolled wire format encodes structurally. Instead the
/// original `Arc<Closure>` is kept alive here, keyed by its pointer
/// identity, so `UNSER` can hand back the exact closure `SER` was given —
/// sufficient for `UNSER(SER(v)) == v` on closures without free variables,
/// since there's no captured state that could have gone stale.
fn closure_registry() -> &'static Mutex<HashMap<usize, Arc<Closure>>> {
    static REG: OnceLock<Mutex<HashMap<usize, Arc<Closure>>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(super) fn register(reg: &mut Registry) {
    reg.add("SER", 1, Some(1), ser);
    reg.add("UNSER", 1, Some(1), unser);
}

fn ser(interp: &Interpreter, env: &Environment, args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let mut seen = HashMap::new();
    let mut out = String::new();
    encode(&vals[0], &mut seen, &mut out);
    Ok(Value::str(out))
}

fn unser(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let text = match &vals[0] {
        Value::Str(s) => s.lock().unwrap().clone(),
        other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("UNSER expects STR, found {}", other.type_tag())), span)),
    };
    let mut parser = JsonParser { bytes: text.as_bytes(), pos: 0 };
    parser.skip_ws();
    let jv = parser.parse_value().map_err(|e| RuntimeDiagnostic::new(RuntimeError::Serde(e), span))?;
    decode(&jv).map_err(|e| RuntimeDiagnostic::new(RuntimeError::Serde(e), span))
}

fn key_of(v: &Value) -> Option<usize> {
    match v {
        Value::Tns(t) => Some(Arc::as_ptr(t) as usize),
        Value::Map(m) => Some(Arc::as_ptr(m) as usize),
        Value::Func(f) => Some(Arc::as_ptr(f) as usize),
        Value::Thr(t) => Some(Arc::as_ptr(t) as usize),
        _ => None,
    }
}

fn encode(v: &Value, seen: &mut HashMap<usize, u32>, out: &mut String) {
    match v {
        Value::Null => out.push_str(r#"{"t":"UNKNOWN","v":null}"#),
        Value::Int(n) => {
            out.push_str(r#"{"t":"INT","v":""#);
            out.push_str(&crate::value::format_int_binary(*n));
            out.push_str(r#""}"#);
        }
        Value::Flt(f) => {
            out.push_str(r#"{"t":"FLT","v":"#);
            out.push_str(&encode_float(*f));
            out.push('}');
        }
        Value::Str(s) => {
            out.push_str(r#"{"t":"STR","v":"#);
            encode_json_string(&s.lock().unwrap(), out);
            out.push('}');
        }
        Value::Tns(t) => {
            let key = key_of(v).unwrap();
            if let Some(id) = seen.get(&key) {
                out.push_str(&format!(r#"{{"t":"TNS","id":{},"ref":true}}"#, id));
                return;
            }
            let id = seen.len() as u32;
            seen.insert(key, id);
            let t = t.lock().unwrap();
            out.push_str(&format!(r#"{{"t":"TNS","id":{},"shape":["#, id));
            for (i, d) in t.shape.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&d.to_string());
            }
            out.push_str(r#"],"v":["#);
            for (i, item) in t.data.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode(item, seen, out);
            }
            out.push_str("]}");
        }
        Value::Map(m) => {
            let key = key_of(v).unwrap();
            if let Some(id) = seen.get(&key) {
                out.push_str(&format!(r#"{{"t":"MAP","id":{},"ref":true}}"#, id));
                return;
            }
            let id = seen.len() as u32;
            seen.insert(key, id);
            let m = m.lock().unwrap();
            out.push_str(&format!(r#"{{"t":"MAP","id":{},"v":["#, id));
            for (i, (k, val)) in m.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(r#"{"k":"#);
                encode(&k.to_value(), seen, out);
                out.push_str(r#","v":"#);
                encode(val, seen, out);
                out.push('}');
            }
            out.push_str("]}");
        }
        Value::Func(f) => {
            let key = key_of(v).unwrap();
            if let Some(id) = seen.get(&key) {
                out.push_str(&format!(r#"{{"t":"FUNC","id":{},"ref":true}}"#, id));
                return;
            }
            let id = seen.len() as u32;
            seen.insert(key, id);
            closure_registry().lock().unwrap().insert(key, f.clone());
            out.push_str(&format!(r#"{{"t":"FUNC","id":{},"def":{{"name":"#, id));
            match &f.name {
                Some(n) => encode_json_string(n, out),
                None => out.push_str("null"),
            }
            out.push_str(r#","params":["#);
            for (i, p) in f.params.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_json_string(&p.name, out);
            }
            out.push_str("],\"body\":");
            out.push_str(&key.to_string());
            out.push_str(",\"closure\":");
            out.push_str(&key.to_string());
            out.push_str("}}");
        }
        Value::Thr(t) => {
            let key = key_of(v).unwrap();
            if let Some(id) = seen.get(&key) {
                out.push_str(&format!(r#"{{"t":"THR","id":{},"ref":true}}"#, id));
                return;
            }
            let id = seen.len() as u32;
            seen.insert(key, id);
            out.push_str(&format!(
                r#"{{"t":"THR","id":{},"started":{},"paused":{},"finished":{}}}"#,
                id,
                t.control.started.load(std::sync::atomic::Ordering::SeqCst),
                t.control.paused.load(std::sync::atomic::Ordering::SeqCst),
                t.control.finished.load(std::sync::atomic::Ordering::SeqCst),
            ));
        }
    }
}

fn encode_float(f: f64) -> String {
    if f.is_nan() {
        "\"NaN\"".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "\"INF\"".to_string() } else { "\"-INF\"".to_string() }
    } else {
        format!("\"{:.17}\"", f)
    }
}

fn encode_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// A bare-bones JSON value, just enough structure to decode the `{t,v}`
/// scheme back into runtime `Value`s.
enum Json {
    Null,
    Str(String),
    Num(f64),
    Arr(Vec<Json>),
    Obj(Vec<(String, Json)>),
    Bool(bool),
}

impl Json {
    fn get<'a>(&'a self, key: &str) -> Option<&'a Json> {
        match self {
            Json::Obj(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
    fn as_str(&self) -> Option<&str> {
        match self {
            Json::Str(s) => Some(s),
            _ => None,
        }
    }
}

struct JsonParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> JsonParser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn parse_value(&mut self) -> Result<Json, String> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => Ok(Json::Str(self.parse_string()?)),
            Some(b't') => {
                self.expect_lit("true")?;
                Ok(Json::Bool(true))
            }
            Some(b'f') => {
                self.expect_lit("false")?;
                Ok(Json::Bool(false))
            }
            Some(b'n') => {
                self.expect_lit("null")?;
                Ok(Json::Null)
            }
            Some(_) => self.parse_number(),
            None => Err("unexpected end of JSON input".to_string()),
        }
    }

    fn expect_lit(&mut self, lit: &str) -> Result<(), String> {
        if self.bytes[self.pos..].starts_with(lit.as_bytes()) {
            self.pos += lit.len();
            Ok(())
        } else {
            Err(format!("expected '{}'", lit))
        }
    }

    fn parse_object(&mut self) -> Result<Json, String> {
        self.pos += 1;
        let mut fields = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Json::Obj(fields));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            if self.peek() != Some(b':') {
                return Err("expected ':'".to_string());
            }
            self.pos += 1;
            let value = self.parse_value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err("expected ',' or '}'".to_string()),
            }
        }
        Ok(Json::Obj(fields))
    }

    fn parse_array(&mut self) -> Result<Json, String> {
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Json::Arr(items));
        }
        loop {
            let value = self.parse_value()?;
            items.push(value);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err("expected ',' or ']'".to_string()),
            }
        }
        Ok(Json::Arr(items))
    }

    fn parse_string(&mut self) -> Result<String, String> {
        if self.peek() != Some(b'"') {
            return Err("expected string".to_string());
        }
        self.pos += 1;
        let mut s = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string".to_string()),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'n') => s.push('\n'),
                        Some(b'r') => s.push('\r'),
                        Some(b't') => s.push('\t'),
                        Some(b'"') => s.push('"'),
                        Some(b'\\') => s.push('\\'),
                        Some(b'u') => {
                            let hex = std::str::from_utf8(&self.bytes[self.pos + 1..self.pos + 5]).map_err(|_| "bad \\u escape")?;
                            let code = u32::from_str_radix(hex, 16).map_err(|_| "bad \\u escape")?;
                            s.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                            self.pos += 4;
                        }
                        _ => return Err("bad escape".to_string()),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    let rest = std::str::from_utf8(&self.bytes[self.pos..]).map_err(|_| "invalid utf8")?;
                    let ch = rest.chars().next().unwrap();
                    s.push(ch);
                    self.pos += ch.len_utf8();
                    let _ = c;
                }
            }
        }
        Ok(s)
    }

    fn parse_number(&mut self) -> Result<Json, String> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9') | Some(b'.') | Some(b'e') | Some(b'E') | Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).map_err(|_| "invalid number")?;
        text.parse::<f64>().map(Json::Num).map_err(|_| "invalid number".to_string())
    }
}

fn decode(j: &Json) -> Result<Value, String> {
    let t = j.get("t").and_then(Json::as_str).ok_or("missing 't' tag")?;
    match t {
        "UNKNOWN" => Ok(Value::Null),
        "INT" => {
            let v = j.get("v").and_then(Json::as_str).ok_or("missing INT value")?;
            let (neg, digits) = match v.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, v),
            };
            i64::from_str_radix(digits, 2)
                .map(|n| Value::Int(if neg { -n } else { n }))
                .map_err(|_| "invalid INT value".to_string())
        }
        "FLT" => {
            let v = j.get("v").and_then(Json::as_str).ok_or("missing FLT value")?;
            let f = match v {
                "INF" => f64::INFINITY,
                "-INF" => f64::NEG_INFINITY,
                "NaN" => f64::NAN,
                other => other.parse::<f64>().map_err(|_| "invalid FLT value")?,
            };
            Ok(Value::Flt(f))
        }
        "STR" => {
            let v = j.get("v").and_then(Json::as_str).ok_or("missing STR value")?;
            Ok(Value::str(v.to_string()))
        }
        "TNS" => {
            let shape = match j.get("shape") {
                Some(Json::Arr(items)) => items
                    .iter()
                    .map(|i| match i {
                        Json::Num(n) => Ok(*n as usize),
                        _ => Err("invalid shape entry".to_string()),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => return Err("missing TNS shape".to_string()),
            };
            let data = match j.get("v") {
                Some(Json::Arr(items)) => items.iter().map(decode).collect::<Result<Vec<_>, _>>()?,
                _ => return Err("missing TNS data".to_string()),
            };
            Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(shape, data)))))
        }
        "MAP" => {
            let mut out = PrefixMap::new();
            if let Some(Json::Arr(items)) = j.get("v") {
                for entry in items {
                    let k = entry.get("k").ok_or("missing map entry key")?;
                    let v = entry.get("v").ok_or("missing map entry value")?;
                    let key = MapKey::from_value(&decode(k)?)?;
                    out.insert(key, decode(v)?);
                }
            }
            Ok(Value::Map(Arc::new(Mutex::new(out))))
        }
        "FUNC" => {
            let key = match j.get("body") {
                Some(Json::Num(n)) => *n as usize,
                _ => return Err("missing FUNC body reference".to_string()),
            };
            closure_registry()
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .map(Value::Func)
                .ok_or_else(|| "UNSER cannot reconstruct a closure from a different process or an expired reference".to_string())
        }
        "THR" => Err(format!("UNSER does not reconstruct {} values", t)),
        other => Err(format!("unknown serialized type tag '{}'", other)),
    }
}
