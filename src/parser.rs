// https://github.com/Geal/nom/blob/master/doc/choosing_a_combinator.md

use log::trace;
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_till1},
    character::complete::{char, space0},
    combinator::{all_consuming, cut},
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::ParseError;

/// Program name followed by its arguments, each owned independently of the
/// line it was read from.
pub(crate) type ArgumentList = Vec<String>;

fn is_blank(chr: char) -> bool {
    chr == ' ' || chr == '\t'
}

// Once the opening quote is seen the argument must be closed, so a missing
// quote is a failure instead of falling back to an unquoted word.
fn quoted_argument(input: &str) -> IResult<&str, &str> {
    preceded(
        char('"'),
        cut(terminated(take_till(|c: char| c == '"'), char('"'))),
    )(input)
}

fn unquoted_argument(input: &str) -> IResult<&str, &str> {
    take_till1(is_blank)(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(terminated(
        many0(preceded(space0, alt((quoted_argument, unquoted_argument)))),
        space0,
    ))(input)
}

/// Splits one input line into arguments.
///
/// An empty result means the line held no command. `max_args` bounds the
/// number of arguments, anything beyond it is rejected.
pub(crate) fn tokenize(line: &str, max_args: usize) -> Result<ArgumentList, ParseError> {
    let (_, args) = arguments(line).map_err(|_| ParseError::MismatchedQuote)?;
    trace!("tokenized {:?} into {:?}", line, args);

    if args.len() > max_args {
        return Err(ParseError::TooManyArguments { limit: max_args });
    }

    Ok(args.into_iter().map(str::to_owned).collect())
}
