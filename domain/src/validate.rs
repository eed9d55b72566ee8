//! Positional argument validation. Messages use the 1-indexed ordinal of the
//! offending argument ("1st", "2nd", ...).

use crate::{CoreError, NewRecord};

/// English ordinal for a 1-indexed position.
pub fn ordinal(position: usize) -> String {
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", position, suffix)
}

/// Require exactly `expected` arguments.
pub fn expect_arity(args: &[String], expected: usize) -> Result<(), CoreError> {
    if args.len() != expected {
        return Err(CoreError::InvalidArgument(format!(
            "incorrect number of arguments, expecting {}, got {}",
            expected,
            args.len()
        )));
    }
    Ok(())
}

/// Argument at zero-based `index`, rejected when empty.
pub fn non_empty(args: &[String], index: usize) -> Result<&str, CoreError> {
    match args.get(index) {
        Some(s) if !s.is_empty() => Ok(s.as_str()),
        _ => Err(CoreError::InvalidArgument(format!(
            "{} argument must be a non-empty string",
            ordinal(index + 1)
        ))),
    }
}

/// Argument at zero-based `index` parsed as a base-10 integer.
pub fn integer(args: &[String], index: usize) -> Result<i64, CoreError> {
    let raw = non_empty(args, index)?;
    raw.parse::<i64>().map_err(|_| {
        CoreError::InvalidArgument(format!(
            "{} argument must be a numeric string",
            ordinal(index + 1)
        ))
    })
}

/// Validate `[personalId, organizationId, name, workDate, hours, comment?]`.
pub fn new_record_from_args(args: &[String]) -> Result<NewRecord, CoreError> {
    if !(5..=6).contains(&args.len()) {
        return Err(CoreError::InvalidArgument(format!(
            "incorrect number of arguments, expecting 5 or 6, got {}",
            args.len()
        )));
    }
    for index in 0..5 {
        non_empty(args, index)?;
    }
    let personal_id = integer(args, 0)?;
    if personal_id <= 0 {
        return Err(CoreError::InvalidArgument(format!(
            "{} argument must be a positive integer",
            ordinal(1)
        )));
    }
    Ok(NewRecord {
        personal_id,
        organization_id: integer(args, 1)?,
        name: args[2].clone(),
        work_date: args[3].clone(),
        hours: integer(args, 4)?,
        comment: args.get(5).cloned(),
    })
}
