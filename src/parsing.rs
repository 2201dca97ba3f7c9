//! Parsers for the numeric values accepted on the command line

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char as match_char, digit1, hex_digit1},
    combinator::{all_consuming, map_res},
    error::{context, convert_error, VerboseError},
    sequence::{preceded, separated_pair},
    Finish, IResult,
};

pub type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

fn hex(i: &str) -> ParseResult<u32> {
    context(
        "hex",
        map_res(preceded(tag_no_case("0x"), hex_digit1), |s| {
            u32::from_str_radix(s, 16)
        }),
    )(i)
}

fn dec(i: &str) -> ParseResult<u32> {
    context("dec", map_res(digit1, str::parse::<u32>))(i)
}

/// A 32-bit value written either as `0x`-prefixed hex or plain decimal
pub fn number(i: &str) -> ParseResult<u32> {
    alt((hex, dec))(i)
}

/// A region written as `BASE:SIZE`
pub fn region(i: &str) -> ParseResult<(u32, u32)> {
    context("region", separated_pair(number, match_char(':'), number))(i)
}

fn parse_all<'a, T>(
    input: &'a str,
    parser: impl FnMut(&'a str) -> ParseResult<'a, T>,
) -> Result<T, String> {
    all_consuming(parser)(input.trim())
        .finish()
        .map(|(_, value)| value)
        .map_err(|e| convert_error(input.trim(), e))
}

/// Parse a complete string as a number
pub fn parse_number(input: &str) -> Result<u32, String> {
    parse_all(input, number)
}

/// Parse a complete string as a `BASE:SIZE` pair
pub fn parse_region(input: &str) -> Result<(u32, u32), String> {
    parse_all(input, region)
}
