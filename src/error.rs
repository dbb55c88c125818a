use ansi_term::Colour;
use snafu::prelude::*;

const ERR_CLR: Colour = Colour::Red;
const POP_CLR: Colour = Colour::Yellow;
const OTH_CLR: Colour = Colour::Cyan;

pub type Result<T, E = SlothError> = std::result::Result<T, E>;

/// Errors raised by the object model
///
/// Each variant corresponds to one kind of error the object model raises.
/// [`SlothError::kind`] gives the kind's name. Proxies raise exactly the errors
/// the wrapped value raises; they add none of their own beyond the ones that
/// concern the wrapped-target slot.
#[derive(Clone, Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SlothError {
    /// An attribute lookup found nothing.
    #[snafu(display("\n{}: `{}` object has no attribute `{}`", ERR_CLR.bold().paint("AttributeError"), POP_CLR.paint(ty), OTH_CLR.paint(name)))]
    Attribute { ty: String, name: String },
    #[snafu(display("\n{}: {message}", ERR_CLR.bold().paint("ValueError")))]
    BadValue { message: String },
    #[snafu(display("\n{}: {message}", ERR_CLR.bold().paint("IndexError")))]
    Index { message: String },
    #[snafu(display("\n{}: {}", ERR_CLR.bold().paint("KeyError"), POP_CLR.paint(key)))]
    Key { key: String },
    #[snafu(display("\n{}: {message}", ERR_CLR.bold().paint("OverflowError")))]
    Overflow { message: String },
    /// Something outside the crate failed.
    ///
    /// Native functions, user methods and proxy factories use this to raise
    /// errors of their own kind.
    #[snafu(display("\n{}: {message}", ERR_CLR.bold().paint(kind)))]
    Raised { kind: String, message: String },
    #[snafu(display("\n{}", ERR_CLR.bold().paint("StopIteration")))]
    StopIteration,
    #[snafu(display("\n{}: {message}", ERR_CLR.bold().paint("TypeError")))]
    Type { message: String },
    #[snafu(display("\n{}: unsupported operand type(s) for {}: {}", ERR_CLR.bold().paint("TypeError"), OTH_CLR.paint(op), join_types(types)))]
    UnsupportedOperand { op: String, types: Vec<String> },
    #[snafu(display("\n{}: {message}", ERR_CLR.bold().paint("ZeroDivisionError")))]
    ZeroDivision { message: String },
}

fn join_types(types: &[String]) -> String {
    let quoted = types
        .iter()
        .map(|t| format!("`{}`", POP_CLR.paint(t)))
        .collect::<Vec<_>>();

    match quoted.len() {
        2 => format!("{} and {}", quoted[0], quoted[1]),
        _ => quoted.join(", "),
    }
}

impl SlothError {
    /// Raise an error of an arbitrary kind.
    pub fn raised<K: AsRef<str>, M: AsRef<str>>(kind: K, message: M) -> Self {
        SlothError::Raised {
            kind: kind.as_ref().to_owned(),
            message: message.as_ref().to_owned(),
        }
    }

    /// The name of this error's kind, e.g. `AttributeError`.
    pub fn kind(&self) -> &str {
        match self {
            SlothError::Attribute { .. } => "AttributeError",
            SlothError::BadValue { .. } => "ValueError",
            SlothError::Index { .. } => "IndexError",
            SlothError::Key { .. } => "KeyError",
            SlothError::Overflow { .. } => "OverflowError",
            SlothError::Raised { kind, .. } => kind,
            SlothError::StopIteration => "StopIteration",
            SlothError::Type { .. } | SlothError::UnsupportedOperand { .. } => "TypeError",
            SlothError::ZeroDivision { .. } => "ZeroDivisionError",
        }
    }

    /// The error text without the kind or any coloring.
    pub fn message(&self) -> String {
        match self {
            SlothError::Attribute { ty, name } => {
                format!("'{ty}' object has no attribute '{name}'")
            }
            SlothError::BadValue { message }
            | SlothError::Index { message }
            | SlothError::Overflow { message }
            | SlothError::Raised { message, .. }
            | SlothError::Type { message }
            | SlothError::ZeroDivision { message } => message.clone(),
            SlothError::Key { key } => key.clone(),
            SlothError::StopIteration => String::new(),
            SlothError::UnsupportedOperand { op, types } => {
                let quoted = types.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>();
                let types = match quoted.len() {
                    2 => format!("{} and {}", quoted[0], quoted[1]),
                    _ => quoted.join(", "),
                };
                format!("unsupported operand type(s) for {op}: {types}")
            }
        }
    }

    pub fn is_attribute_error(&self) -> bool {
        self.kind() == "AttributeError"
    }

    pub fn is_type_error(&self) -> bool {
        self.kind() == "TypeError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let err = AttributeSnafu {
            ty: "int",
            name: "foo",
        }
        .build();
        assert_eq!(err.kind(), "AttributeError");
        assert_eq!(err.message(), "'int' object has no attribute 'foo'");
        assert!(err.is_attribute_error());

        let err = UnsupportedOperandSnafu {
            op: "+",
            types: vec!["int".to_owned(), "str".to_owned()],
        }
        .build();
        assert!(err.is_type_error());
        assert_eq!(
            err.message(),
            "unsupported operand type(s) for +: 'int' and 'str'"
        );

        let err = SlothError::raised("RuntimeError", "boom");
        assert_eq!(err.kind(), "RuntimeError");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn display_names_the_kind() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let err = TypeSnafu {
            message: "'int' object is not callable",
        }
        .build();
        let shown = err.to_string();
        assert!(shown.contains("TypeError"));
        assert!(shown.contains("is not callable"));
    }
}
