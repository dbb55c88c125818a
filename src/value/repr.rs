//! Text and byte renderings of values
use crate::{
    error::{BadValueSnafu, Result, TypeSnafu},
    keywords::{BYTES, FORMAT, REPR, STR},
    s_read, SlothFloat, Value,
};

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

fn bytes_repr(bytes: &[u8]) -> String {
    let mut out = String::from("b'");
    for b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(*b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('\'');
    out
}

fn float_repr(f: SlothFloat) -> String {
    if f.is_nan() {
        "nan".to_owned()
    } else if f.is_infinite() {
        (if f > 0.0 { "inf" } else { "-inf" }).to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn joined(items: &[Value]) -> Result<String> {
    Ok(items
        .iter()
        .map(|item| item.repr())
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}

fn returned_string(value: Value, method: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => TypeSnafu {
            message: format!("{method} returned non-string (type {})", other.type_name()),
        }
        .fail(),
    }
}

fn signed_radix(i: i64, prefix: &str, digits: impl Fn(u64) -> String) -> String {
    if i < 0 {
        format!("-{prefix}{}", digits(i.unsigned_abs()))
    } else {
        format!("{prefix}{}", digits(i as u64))
    }
}

impl Value {
    /// The developer-facing rendering, `repr(self)`
    pub fn repr(&self) -> Result<String> {
        match self {
            Value::Proxy(proxy) => proxy.repr(),
            Value::None => Ok("None".to_owned()),
            Value::NotImplemented => Ok("NotImplemented".to_owned()),
            Value::Boolean(true) => Ok("True".to_owned()),
            Value::Boolean(false) => Ok("False".to_owned()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(float_repr(*f)),
            Value::String(s) => Ok(quote(s)),
            Value::Bytes(b) => Ok(bytes_repr(b)),
            Value::Tuple(items) if items.len() == 1 => Ok(format!("({},)", items[0].repr()?)),
            Value::Tuple(items) => Ok(format!("({})", joined(items)?)),
            Value::List(list) => {
                let items = s_read!(list).clone();
                Ok(format!("[{}]", joined(&items)?))
            }
            Value::Dict(dict) => {
                let items = s_read!(dict).items();
                let rendered = items
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", k.repr()?, v.repr()?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{{{}}}", rendered.join(", ")))
            }
            Value::Slice(slice) => Ok(slice.to_string()),
            Value::Function(function) => Ok(format!(
                "<function {} at 0x{:x}>",
                s_read!(function).qualname(),
                self.address().unwrap_or_default()
            )),
            Value::Method(method) => {
                let name = s_read!(method.function()).qualname().to_owned();
                Ok(format!("<bound method {name} of {}>", method.receiver().repr()?))
            }
            Value::Class(class) => {
                let class = s_read!(class);
                Ok(format!("<class '{}.{}'>", class.module(), class.qualname()))
            }
            Value::Type(builtin) => Ok(format!("<class '{}'>", builtin.name())),
            Value::Iterator(_) => Ok(format!(
                "<iterator object at 0x{:x}>",
                self.address().unwrap_or_default()
            )),
            Value::ProxyClass(class) => Ok(format!("<class '{}.{}'>", class.module(), class.name())),
            Value::Object(_) => match self.dunder(REPR, &[])? {
                Some(value) => returned_string(value, REPR),
                None => Ok(format!(
                    "<{}.{} object at 0x{:x}>",
                    self.get_attr(crate::keywords::MODULE)?.to_str()?,
                    self.type_name(),
                    self.address().unwrap_or_default()
                )),
            },
        }
    }

    /// The user-facing rendering, `str(self)`
    pub fn to_str(&self) -> Result<String> {
        match self {
            Value::Proxy(proxy) => proxy.to_str(),
            Value::String(s) => Ok(s.clone()),
            Value::Object(_) => match self.dunder(STR, &[])? {
                Some(value) => returned_string(value, STR),
                None => self.repr(),
            },
            _ => self.repr(),
        }
    }

    /// `bytes(self)`
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Value::Proxy(proxy) => proxy.to_bytes(),
            Value::Bytes(b) => Ok(b.clone()),
            Value::Integer(n) => {
                let n = usize::try_from(*n).map_err(|_| {
                    BadValueSnafu {
                        message: "negative count",
                    }
                    .build()
                })?;
                Ok(vec![0; n])
            }
            Value::String(_) => TypeSnafu {
                message: "string argument without an encoding",
            }
            .fail(),
            Value::List(_) | Value::Tuple(_) => {
                let mut bytes = Vec::new();
                for item in self.iterate()? {
                    let byte = item?.index()?;
                    let byte = u8::try_from(byte).map_err(|_| {
                        BadValueSnafu {
                            message: "bytes must be in range(0, 256)",
                        }
                        .build()
                    })?;
                    bytes.push(byte);
                }
                Ok(bytes)
            }
            Value::Object(_) => match self.dunder(BYTES, &[])? {
                Some(Value::Bytes(b)) => Ok(b),
                Some(other) => TypeSnafu {
                    message: format!(
                        "{BYTES} returned non-bytes (type {})",
                        other.type_name()
                    ),
                }
                .fail(),
                None => self.cannot_convert_to_bytes(),
            },
            _ => self.cannot_convert_to_bytes(),
        }
    }

    fn cannot_convert_to_bytes(&self) -> Result<Vec<u8>> {
        TypeSnafu {
            message: format!(
                "cannot convert '{}' object to bytes",
                self.type_name()
            ),
        }
        .fail()
    }

    /// `format(self, spec)`
    ///
    /// Integers understand `d`, `x`, `X`, `o` and `b`; floats understand a
    /// precision such as `.2f`. User objects may define `__format__`.
    pub fn format(&self, spec: &str) -> Result<String> {
        match self {
            Value::Proxy(proxy) => proxy.format(spec),
            Value::Object(_) => match self.dunder(FORMAT, &[Value::from(spec)])? {
                Some(value) => returned_string(value, FORMAT),
                None if spec.is_empty() => self.to_str(),
                None => self.bad_format(spec),
            },
            _ if spec.is_empty() => self.to_str(),
            Value::Integer(_) | Value::Boolean(_) => {
                let i = self.index()?;
                match spec {
                    "d" => Ok(i.to_string()),
                    "x" => Ok(signed_radix(i, "", |u| format!("{u:x}"))),
                    "X" => Ok(signed_radix(i, "", |u| format!("{u:X}"))),
                    "o" => Ok(signed_radix(i, "", |u| format!("{u:o}"))),
                    "b" => Ok(signed_radix(i, "", |u| format!("{u:b}"))),
                    _ => self.unknown_format_code(spec),
                }
            }
            Value::Float(f) => {
                let precision = spec
                    .strip_prefix('.')
                    .and_then(|s| s.strip_suffix('f'))
                    .and_then(|p| p.parse::<usize>().ok());
                match precision {
                    Some(precision) => Ok(format!("{f:.precision$}")),
                    None => self.unknown_format_code(spec),
                }
            }
            _ => self.bad_format(spec),
        }
    }

    fn unknown_format_code(&self, spec: &str) -> Result<String> {
        BadValueSnafu {
            message: format!(
                "Unknown format code '{spec}' for object of type '{}'",
                self.type_name()
            ),
        }
        .fail()
    }

    fn bad_format(&self, spec: &str) -> Result<String> {
        TypeSnafu {
            message: format!(
                "unsupported format string passed to {}.{FORMAT}: '{spec}'",
                self.type_name()
            ),
        }
        .fail()
    }

    /// `oct(self)`
    pub fn oct(&self) -> Result<String> {
        Ok(signed_radix(self.index()?, "0o", |u| format!("{u:o}")))
    }

    /// `hex(self)`
    pub fn hex(&self) -> Result<String> {
        Ok(signed_radix(self.index()?, "0x", |u| format!("{u:x}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Args, Class, Dict, Function};

    #[test]
    fn reprs() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::None.repr().unwrap(), "None");
        assert_eq!(Value::from(true).repr().unwrap(), "True");
        assert_eq!(Value::from(2.0).repr().unwrap(), "2.0");
        assert_eq!(Value::from("it's").repr().unwrap(), "\"it's\"");
        assert_eq!(Value::bytes(b"a\x00").repr().unwrap(), "b'a\\x00'");
        assert_eq!(Value::tuple(vec![1.into()]).repr().unwrap(), "(1,)");
        assert_eq!(
            Value::from(vec![Value::from(1), Value::from("a")])
                .repr()
                .unwrap(),
            "[1, 'a']"
        );

        let dict = Value::from(Dict::from_pairs(vec![("k", 1)]).unwrap());
        assert_eq!(dict.repr().unwrap(), "{'k': 1}");
    }

    #[test]
    fn strs() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::from("plain").to_str().unwrap(), "plain");
        assert_eq!(Value::from(vec!["a"]).to_str().unwrap(), "['a']");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
    }

    #[test]
    fn user_renderings() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = Class::new("Named").with(
            "__str__",
            Function::new("__str__", |_: &Args| Ok(Value::from("named"))),
        );
        let object = Value::from(class).call_with([]).unwrap();

        assert_eq!(object.to_str().unwrap(), "named");
        assert!(object.repr().unwrap().starts_with("<__main__.Named object at 0x"));
    }

    #[test]
    fn byte_conversion() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::from(3).to_bytes().unwrap(), vec![0, 0, 0]);
        assert_eq!(
            Value::from(vec![104, 105]).to_bytes().unwrap(),
            b"hi".to_vec()
        );
        assert!(Value::from("hi").to_bytes().unwrap_err().is_type_error());
    }

    #[test]
    fn formatting() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::from(255).format("x").unwrap(), "ff");
        assert_eq!(Value::from(-5).format("b").unwrap(), "-101");
        assert_eq!(Value::from(1.23456).format(".2f").unwrap(), "1.23");
        assert_eq!(Value::from("s").format("").unwrap(), "s");
        assert!(Value::from(1).format("q").is_err());
        assert_eq!(Value::from(8).oct().unwrap(), "0o10");
        assert_eq!(Value::from(-255).hex().unwrap(), "-0xff");
    }
}
