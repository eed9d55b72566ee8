//! Named operations accepted by the ledger service, parsed from a function
//! name and its ordered string arguments.

use std::fmt::{Display, Formatter};

use crate::validate::{expect_arity, new_record_from_args, non_empty};
use crate::{CoreError, NewRecord};

/// Typed operation with its validated arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Seed the sentinel key.
    Init { value: String },
    /// Raw key/value write.
    Write { key: String, value: String },
    /// Raw key read.
    Read { key: String },
    AddRecord(NewRecord),
    UpdateComment {
        personal_id: String,
        comment: String,
    },
    Search {
        personal_id: String,
        organization_id: String,
    },
}

impl Operation {
    /// Parse a call arriving through `entry`. Functions belonging to the
    /// other entry point are rejected as unknown before their arguments are
    /// looked at.
    pub fn parse_for(entry: EntryPoint, function: &str, args: &[String]) -> Result<Self, CoreError> {
        match EntryPoint::of_function(function) {
            Some(owner) if owner == entry => Self::parse(entry, function, args),
            _ => Err(CoreError::UnknownFunction {
                entry,
                name: function.to_string(),
            }),
        }
    }

    fn parse(entry: EntryPoint, function: &str, args: &[String]) -> Result<Self, CoreError> {
        match function {
            "init" => {
                expect_arity(args, 1)?;
                Ok(Operation::Init {
                    value: args[0].clone(),
                })
            }
            "write" => {
                expect_arity(args, 2)?;
                Ok(Operation::Write {
                    key: non_empty(args, 0)?.to_string(),
                    value: non_empty(args, 1)?.to_string(),
                })
            }
            "read" => {
                expect_arity(args, 1)?;
                Ok(Operation::Read {
                    key: non_empty(args, 0)?.to_string(),
                })
            }
            "addRecord" => Ok(Operation::AddRecord(new_record_from_args(args)?)),
            "updateComment" => {
                expect_arity(args, 2)?;
                Ok(Operation::UpdateComment {
                    personal_id: args[0].clone(),
                    comment: args[1].clone(),
                })
            }
            "search" => {
                expect_arity(args, 2)?;
                Ok(Operation::Search {
                    personal_id: args[0].clone(),
                    organization_id: args[1].clone(),
                })
            }
            other => Err(CoreError::UnknownFunction {
                entry,
                name: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init { .. } => "init",
            Operation::Write { .. } => "write",
            Operation::Read { .. } => "read",
            Operation::AddRecord(_) => "addRecord",
            Operation::UpdateComment { .. } => "updateComment",
            Operation::Search { .. } => "search",
        }
    }

    /// Whether the operation leaves ledger state untouched.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Operation::Read { .. } | Operation::Search { .. })
    }
}

/// Entry point a call arrives through. State-changing operations go through
/// `Invoke`, read-only ones through `Query`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryPoint {
    Invoke,
    Query,
}

impl EntryPoint {
    /// Entry point that serves `function`, `None` for unknown names.
    pub fn of_function(function: &str) -> Option<Self> {
        match function {
            "read" | "search" => Some(EntryPoint::Query),
            "init" | "write" | "addRecord" | "updateComment" => Some(EntryPoint::Invoke),
            _ => None,
        }
    }
}

impl Display for EntryPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPoint::Invoke => write!(f, "invocation"),
            EntryPoint::Query => write!(f, "query"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn parse(function: &str, a: &[String]) -> Result<Operation, CoreError> {
        let entry = EntryPoint::of_function(function).unwrap_or(EntryPoint::Invoke);
        Operation::parse_for(entry, function, a)
    }

    #[test]
    fn parses_each_operation() {
        assert_eq!(
            parse("init", &args(&["v"])).unwrap(),
            Operation::Init { value: "v".into() }
        );
        assert_eq!(
            parse("write", &args(&["k", "v"])).unwrap().name(),
            "write"
        );
        assert_eq!(
            parse("read", &args(&["k"])).unwrap(),
            Operation::Read { key: "k".into() }
        );
        assert_eq!(
            parse("search", &args(&["1", ""])).unwrap(),
            Operation::Search {
                personal_id: "1".into(),
                organization_id: String::new(),
            }
        );
        assert_eq!(
            parse("updateComment", &args(&["1", "c"]))
                .unwrap()
                .name(),
            "updateComment"
        );
    }

    #[test]
    fn add_record_arity() {
        assert!(parse("addRecord", &args(&["1", "2", "n", "d"])).is_err());
        assert!(parse("addRecord", &args(&["1", "2", "n", "d", "3"])).is_ok());
        assert!(parse("addRecord", &args(&["1", "2", "n", "d", "3", "c"])).is_ok());
        let err =
            parse("addRecord", &args(&["1", "2", "n", "d", "3", "c", "x"])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn raw_write_requires_non_empty_key_and_value() {
        assert!(matches!(
            parse("write", &args(&["", "v"])),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("write", &args(&["k", ""])),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unknown_function_rejected() {
        let err = parse("delete", &args(&["k"])).unwrap_err();
        assert!(matches!(err, CoreError::UnknownFunction { ref name, .. } if name == "delete"));
    }

    #[test]
    fn update_comment_accepts_empty_id() {
        assert_eq!(
            parse("updateComment", &args(&["", "c"])).unwrap(),
            Operation::UpdateComment {
                personal_id: String::new(),
                comment: "c".into(),
            }
        );
    }

    #[test]
    fn entry_points_split_reads_from_writes() {
        let read = args(&["k"]);
        assert!(Operation::parse_for(EntryPoint::Query, "read", &read).is_ok());
        let err = Operation::parse_for(EntryPoint::Invoke, "read", &read).unwrap_err();
        assert_eq!(err.to_string(), "received unknown function invocation: read");

        let write = args(&["k", "v"]);
        assert!(Operation::parse_for(EntryPoint::Invoke, "write", &write).is_ok());
        assert!(Operation::parse_for(EntryPoint::Query, "write", &write).is_err());
    }

    #[test]
    fn misrouted_function_is_unknown_even_with_bad_args() {
        let err = Operation::parse_for(EntryPoint::Query, "addRecord", &[]).unwrap_err();
        assert!(matches!(err, CoreError::UnknownFunction { .. }));
    }

    #[test]
    fn every_parsed_operation_belongs_to_its_entry_point() {
        let cases: [(&str, Vec<String>); 6] = [
            ("init", args(&["v"])),
            ("write", args(&["k", "v"])),
            ("read", args(&["k"])),
            ("addRecord", args(&["1", "2", "n", "d", "3"])),
            ("updateComment", args(&["1", "c"])),
            ("search", args(&["1", "2"])),
        ];
        for (function, a) in cases {
            let op = parse(function, &a).unwrap();
            let expected = if op.is_read_only() {
                EntryPoint::Query
            } else {
                EntryPoint::Invoke
            };
            assert_eq!(EntryPoint::of_function(function), Some(expected), "{function}");
        }
    }

    #[test]
    fn unknown_function_reports_entry_point() {
        let err = Operation::parse_for(EntryPoint::Query, "nope", &[]).unwrap_err();
        assert_eq!(err.to_string(), "received unknown function query: nope");
    }
}
