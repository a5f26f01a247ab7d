//! Command templates and the shared link to the instrument.

use std::rc::Rc;

use siggen_traits::DeviceProxy;

use crate::error::EngineError;
use crate::hw_error::map_proxy_error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Channel,
    Value,
}

/// A command or query with `{ch}` and `{value}` placeholders, parsed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    pub fn parse(source: &str) -> Result<Self, EngineError> {
        let bad = |reason: &str| EngineError::Template {
            template: source.to_string(),
            reason: reason.to_string(),
        };
        if source.trim().is_empty() {
            return Err(bad("empty template"));
        }
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        while let Some(pos) = rest.find(['{', '}']) {
            if rest[pos..].starts_with('}') {
                return Err(bad("unbalanced '}'"));
            }
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let close = after.find('}').ok_or_else(|| bad("unbalanced '{'"))?;
            let seg = match &after[..close] {
                "ch" => Segment::Channel,
                "value" => Segment::Value,
                other => return Err(bad(&format!("unknown placeholder '{{{other}}}'"))),
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(seg);
            rest = &after[close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Parse a template that must carry a `{value}` slot.
    pub fn parse_with_value(source: &str) -> Result<Self, EngineError> {
        let t = Self::parse(source)?;
        if !t.has_value() {
            return Err(EngineError::Template {
                template: source.to_string(),
                reason: "missing {value}".to_string(),
            });
        }
        Ok(t)
    }

    /// Parse a template that must not carry a `{value}` slot.
    pub fn parse_without_value(source: &str) -> Result<Self, EngineError> {
        let t = Self::parse(source)?;
        if t.has_value() {
            return Err(EngineError::Template {
                template: source.to_string(),
                reason: "{value} is not allowed here".to_string(),
            });
        }
        Ok(t)
    }

    pub fn has_value(&self) -> bool {
        self.segments.contains(&Segment::Value)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, channel: u8, value: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + value.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Channel => out.push_str(&channel.to_string()),
                Segment::Value => out.push_str(value),
            }
        }
        out
    }
}

/// Shared handle to the instrument used by every feature controller.
///
/// Checks the connection before each call and maps proxy errors to
/// [`EngineError`]. Cloning the link shares the same proxy.
#[derive(Clone)]
pub struct DeviceLink {
    proxy: Rc<dyn DeviceProxy>,
}

impl core::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("connected", &self.proxy.is_connected())
            .finish()
    }
}

impl DeviceLink {
    pub fn new(proxy: Rc<dyn DeviceProxy>) -> Self {
        Self { proxy }
    }

    pub fn is_connected(&self) -> bool {
        self.proxy.is_connected()
    }

    pub fn command(&self, text: &str) -> Result<(), EngineError> {
        if !self.proxy.is_connected() {
            return Err(EngineError::Disconnected);
        }
        tracing::debug!(command = text, "-> device");
        self.proxy.send_command(text).map_err(|e| {
            let mapped = map_proxy_error(e.as_ref());
            tracing::warn!(command = text, error = %mapped, "device command failed");
            mapped
        })
    }

    pub fn query(&self, text: &str) -> Result<String, EngineError> {
        if !self.proxy.is_connected() {
            return Err(EngineError::Disconnected);
        }
        match self.proxy.send_query(text) {
            Ok(reply) => {
                tracing::debug!(query = text, reply = reply.as_str(), "<- device");
                Ok(reply)
            }
            Err(e) => {
                let mapped = map_proxy_error(e.as_ref());
                tracing::warn!(query = text, error = %mapped, "device query failed");
                Err(mapped)
            }
        }
    }
}

/// Numeric part of a reply such as `"1.000000E+03"`, `"+5.0 V"` or `"250HZ"`.
pub fn parse_number(reply: &str) -> Option<f64> {
    let t = reply.trim().trim_matches('"').trim();
    let end = t
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .map_or(t.len(), |(i, _)| i);
    let mut num = &t[..end];
    // "5E" from "5EXT" style suffixes
    while !num.is_empty() {
        if let Ok(v) = num.parse::<f64>() {
            return v.is_finite().then_some(v);
        }
        num = &num[..num.len() - 1];
    }
    None
}

/// ON/OFF style switch reply; any non-zero number counts as on.
pub fn parse_switch(reply: &str) -> Option<bool> {
    let t = reply.trim().trim_matches('"').trim();
    if t.eq_ignore_ascii_case("ON") {
        return Some(true);
    }
    if t.eq_ignore_ascii_case("OFF") {
        return Some(false);
    }
    parse_number(t).map(|v| v != 0.0)
}
