use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{pair, preceded, terminated, tuple},
};

use crate::SchemeError;
use crate::ast::{SYMBOL_SPECIAL_CHARS, Value};

/// Convert nom parsing errors to user-friendly messages.
///
/// The returned text is the payload of [`SchemeError::Parser`], which renders
/// as "Parse error at <msg>", so every message starts with a position.
fn parse_error_to_message(input: &str, error: nom::Err<Error<&str>>) -> String {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::Char => format!("position {}: expected character", position),
                ErrorKind::Tag => format!("position {}: unexpected token", position),
                _ => {
                    if position < input.len() {
                        let remaining_chars: String =
                            input.chars().skip(position).take(10).collect();
                        format!("position {}, near '{}'", position, remaining_chars)
                    } else {
                        format!("position {}: unexpected end of input", position)
                    }
                }
            }
        }
        nom::Err::Incomplete(_) => "end of input: incomplete expression".to_string(),
    }
}

fn is_digit_or_dot(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Parse a rational literal `p/q`. A zero denominator is rejected here so no
/// Rational value with q = 0 can ever be constructed.
fn parse_rational(input: &str) -> IResult<&str, Value> {
    let (input, text) = recognize(tuple((opt(char('-')), digit1, char('/'), digit1)))(input)?;

    let (p_str, q_str) = text.split_once('/').expect("rational always contains /");
    let numeric_err = || nom::Err::Error(Error::new(input, ErrorKind::Digit));
    let p = p_str.parse::<i64>().map_err(|_| numeric_err())?;
    let q = q_str.parse::<i64>().map_err(|_| numeric_err())?;
    if q == 0 {
        return Err(numeric_err());
    }
    Ok((input, Value::Rational(p, q)))
}

/// Parse a complex literal `a+bi` / `a-bi`; the sign belongs to the
/// imaginary part.
fn parse_complex(input: &str) -> IResult<&str, Value> {
    let (input, re_str) = recognize(pair(opt(char('-')), take_while1(is_digit_or_dot)))(input)?;
    let (input, sign) = alt((char('+'), char('-')))(input)?;
    let (input, im_str) = take_while1(is_digit_or_dot)(input)?;
    let (input, _) = char('i')(input)?;

    let numeric_err = || nom::Err::Error(Error::new(input, ErrorKind::Float));
    let re = re_str.parse::<f64>().map_err(|_| numeric_err())?;
    let im = im_str.parse::<f64>().map_err(|_| numeric_err())?;
    let im = if sign == '-' { -im } else { im };
    Ok((input, Value::Complex(re, im)))
}

/// Parse a float, either `#d` prefixed or in bare `digits.digits` form
fn parse_float(input: &str) -> IResult<&str, Value> {
    alt((parse_prefixed_float, parse_bare_float))(input)
}

fn parse_prefixed_float(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#d")(input)?;
    let (input, digits) = take_while1(is_digit_or_dot)(input)?;

    match digits.parse::<f64>() {
        Ok(x) => Ok((input, Value::Float(x))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

fn parse_bare_float(input: &str) -> IResult<&str, Value> {
    let (input, text) =
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1)))(input)?;

    match text.parse::<f64>() {
        Ok(x) => Ok((input, Value::Float(x))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

/// Parse an integer (decimal, hexadecimal or octal)
fn parse_number(input: &str) -> IResult<&str, Value> {
    alt((parse_hexadecimal, parse_octal, parse_decimal))(input)
}

fn parse_decimal(input: &str) -> IResult<&str, Value> {
    let (input, number_str) = recognize(pair(
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
    ))(input)?;

    match number_str.parse::<i64>() {
        Ok(n) => Ok((input, Value::Number(n))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
    }
}

fn parse_hexadecimal(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('#')(input)?;
    let (input, _) = alt((char('x'), char('X')))(input)?;
    let (input, hex_digits) = take_while1(|c: char| c.is_ascii_hexdigit())(input)?;

    match i64::from_str_radix(hex_digits, 16) {
        Ok(n) => Ok((input, Value::Number(n))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::HexDigit))),
    }
}

fn parse_octal(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('#')(input)?;
    let (input, _) = alt((char('o'), char('O')))(input)?;
    let (input, oct_digits) = take_while1(|c: char| ('0'..='7').contains(&c))(input)?;

    match i64::from_str_radix(oct_digits, 8) {
        Ok(n) => Ok((input, Value::Number(n))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::OctDigit))),
    }
}

/// Parse a string literal. Recognized escapes are `\\`, `\"`, `\n`, `\r`,
/// `\t`; any other backslash sequence is a parse error.
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('"')(input)?;
    let mut chars = Vec::new();
    let mut remaining = input;

    while let Some(ch) = remaining.chars().next() {
        if ch == '"' {
            remaining = &remaining[1..];
            return Ok((remaining, Value::String(chars.into_iter().collect())));
        } else if ch == '\\' {
            let mut char_iter = remaining.chars();
            char_iter.next(); // consume '\'
            if let Some(escaped) = char_iter.next() {
                let escaped_char = match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    _ => {
                        return Err(nom::Err::Error(Error::new(
                            remaining,
                            ErrorKind::Escaped,
                        )));
                    }
                };
                chars.push(escaped_char);
                remaining = &remaining[1 + escaped.len_utf8()..];
            } else {
                return Err(nom::Err::Error(Error::new(remaining, ErrorKind::Char)));
            }
        } else {
            chars.push(ch);
            remaining = &remaining[ch.len_utf8()..];
        }
    }

    // Reached end of input without a closing quote
    Err(nom::Err::Error(Error::new(remaining, ErrorKind::Char)))
}

/// Parse a character literal: `#\x` for a single letter, or the named
/// spellings `#\newline` and `#\space`.
fn parse_char(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#\\")(input)?;
    let (input, name) = take_while1(|c: char| c.is_ascii_alphabetic())(input)?;

    match name {
        "newline" => Ok((input, Value::Char('\n'))),
        "space" => Ok((input, Value::Char(' '))),
        single if single.chars().count() == 1 => {
            Ok((input, Value::Char(single.chars().next().unwrap())))
        }
        _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    }
}

/// Parse a vector literal `#(e1 e2 ... en)`
fn parse_vector(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#(")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, elements) = separated_list0(multispace1, parse_expr)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, Value::Vector(elements)))
}

/// Parse an atom. `#t` and `#f` are promoted to booleans; everything else
/// becomes a symbol with the literal text.
fn parse_atom(input: &str) -> IResult<&str, Value> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)),
        |s: &str| match s {
            "#t" => Value::Bool(true),
            "#f" => Value::Bool(false),
            _ => Value::Symbol(s.to_string()),
        },
    )(input)
}

/// Parse a quoted expression ('expr -> (quote expr))
fn parse_quoted(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('\'')(input)?;
    let (input, expr) = parse_expr(input)?;
    Ok((
        input,
        Value::List(vec![Value::Symbol("quote".to_string()), expr]),
    ))
}

/// Parse a quasiquoted list. The reader only rewrites structure: `,expr`
/// items become `(unquote expr)` and the whole form becomes
/// `(quasiquote (items...))`. No splicing or evaluation happens here.
fn parse_quasiquoted(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('`')(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, items) = separated_list0(multispace1, parse_quasi_item)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    Ok((
        input,
        Value::List(vec![
            Value::Symbol("quasiquote".to_string()),
            Value::List(items),
        ]),
    ))
}

fn parse_quasi_item(input: &str) -> IResult<&str, Value> {
    alt((parse_unquote, parse_expr))(input)
}

fn parse_unquote(input: &str) -> IResult<&str, Value> {
    let (input, _) = char(',')(input)?;
    let (input, expr) = parse_expr(input)?;
    Ok((
        input,
        Value::List(vec![Value::Symbol("unquote".to_string()), expr]),
    ))
}

/// Parse a parenthesized form: a proper list, or a dotted list when the
/// elements are followed by ` . tail`. An empty head with a tail (`(. x)`)
/// is rejected so no empty dotted list can be produced.
fn parse_parens(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, elements) = separated_list0(multispace1, parse_expr)(input)?;
    let (input, tail) = opt(preceded(pair(multispace1, char('.')), parse_expr))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;

    match tail {
        Some(tail_value) => {
            if elements.is_empty() {
                Err(nom::Err::Error(Error::new(input, ErrorKind::SeparatedList)))
            } else {
                Ok((input, Value::DottedList(elements, Box::new(tail_value))))
            }
        }
        None => Ok((input, Value::List(elements))),
    }
}

/// Parse one expression. Alternatives are tried in order and backtrack on
/// failure; every `#`-discriminated form is tried before the bare atom rule
/// so `#x2A`, `#d1.5`, `#\a` and `#(...)` are reachable.
fn parse_expr(input: &str) -> IResult<&str, Value> {
    preceded(
        multispace0,
        alt((
            parse_rational,
            parse_complex,
            parse_float,
            parse_number,
            parse_string,
            parse_char,
            parse_vector,
            parse_atom,
            parse_quoted,
            parse_quasiquoted,
            parse_parens,
        )),
    )(input)
}

/// Parse exactly one expression from the input; trailing non-whitespace is
/// an error.
pub fn parse(input: &str) -> Result<Value, SchemeError> {
    match terminated(parse_expr, multispace0)(input) {
        Ok(("", value)) => Ok(value),
        Ok((remaining, _)) => {
            let position = input.len().saturating_sub(remaining.len());
            let preview: String = remaining.chars().take(10).collect();
            Err(SchemeError::Parser(format!(
                "position {}: unexpected trailing input '{}'",
                position, preview
            )))
        }
        Err(e) => Err(SchemeError::Parser(parse_error_to_message(input, e))),
    }
}

/// Parse a whitespace-separated sequence of expressions, as found in a
/// source file consumed by `load` or `read-all`.
pub fn parse_all(input: &str) -> Result<Vec<Value>, SchemeError> {
    let mut exprs = Vec::new();
    let mut rest = input;
    loop {
        if rest.trim_start().is_empty() {
            return Ok(exprs);
        }
        match parse_expr(rest) {
            Ok((next, value)) => {
                exprs.push(value);
                rest = next;
            }
            Err(e) => return Err(SchemeError::Parser(parse_error_to_message(input, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    #[test]
    fn test_parse_number() {
        // Decimal numbers
        assert_eq!(parse("42").unwrap(), Value::Number(42));
        assert_eq!(parse("-5").unwrap(), Value::Number(-5));
        assert_eq!(parse("0").unwrap(), Value::Number(0));

        // Hexadecimal numbers
        assert_eq!(parse("#x1A").unwrap(), Value::Number(26));
        assert_eq!(parse("#X1a").unwrap(), Value::Number(26));
        assert_eq!(parse("#xff").unwrap(), Value::Number(255));

        // Octal numbers
        assert_eq!(parse("#o17").unwrap(), Value::Number(15));
        assert_eq!(parse("#o0").unwrap(), Value::Number(0));
        assert_eq!(parse("#O777").unwrap(), Value::Number(511));

        // Edge cases
        assert_eq!(
            parse("9223372036854775807").unwrap(),
            Value::Number(i64::MAX)
        );
        assert_eq!(
            parse("-9223372036854775808").unwrap(),
            Value::Number(i64::MIN)
        );

        // Should fail
        assert!(parse("").is_err());
        assert!(parse("123abc").is_err());

        // Malformed radix prefixes fall back to the atom rule, because '#'
        // is an ordinary symbol character
        assert_eq!(parse("#x").unwrap(), Value::Symbol("#x".to_string()));
        assert_eq!(parse("#o8").unwrap(), Value::Symbol("#o8".to_string()));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse("3.14").unwrap(), Value::Float(3.14));
        assert_eq!(parse("-0.5").unwrap(), Value::Float(-0.5));
        assert_eq!(parse("#d3.14").unwrap(), Value::Float(3.14));
        assert_eq!(parse("#d42").unwrap(), Value::Float(42.0));

        // A bare trailing or leading dot is not a float
        assert!(parse("1.").is_err());
        assert!(parse(".5").is_err());
    }

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse("3/4").unwrap(), Value::Rational(3, 4));
        assert_eq!(parse("-1/2").unwrap(), Value::Rational(-1, 2));
        assert_eq!(parse("10/10").unwrap(), Value::Rational(10, 10));

        // Zero denominator is a parse error
        assert!(parse("1/0").is_err());
    }

    #[test]
    fn test_parse_complex() {
        assert_eq!(parse("1+2i").unwrap(), Value::Complex(1.0, 2.0));
        assert_eq!(parse("1-2i").unwrap(), Value::Complex(1.0, -2.0));
        assert_eq!(parse("1.5+0.5i").unwrap(), Value::Complex(1.5, 0.5));
        assert_eq!(parse("-1+2i").unwrap(), Value::Complex(-1.0, 2.0));

        // Missing the trailing i falls through and fails
        assert!(parse("1+2").is_err());
    }

    #[test]
    fn test_parse_symbol() {
        assert_eq!(parse("foo").unwrap(), sym("foo"));
        assert_eq!(parse("+").unwrap(), sym("+"));
        assert_eq!(parse(">=").unwrap(), sym(">="));
        assert_eq!(parse("set!").unwrap(), sym("set!"));
        assert_eq!(parse("string->list").unwrap(), sym("string->list"));
        assert_eq!(parse("test?name").unwrap(), sym("test?name"));
        assert_eq!(parse("var123").unwrap(), sym("var123"));
        assert_eq!(parse("~weird$name~").unwrap(), sym("~weird$name~"));

        // '#' is a symbol character, so unrecognized #-forms become symbols
        assert_eq!(parse("#foo").unwrap(), sym("#foo"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse("#t").unwrap(), Value::Bool(true));
        assert_eq!(parse("#f").unwrap(), Value::Bool(false));

        // Case sensitive; longer spellings stay symbols
        assert_eq!(parse("#true").unwrap(), sym("#true"));
        assert_eq!(parse("#T").unwrap(), sym("#T"));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse("\"hello\"").unwrap(), val("hello"));
        assert_eq!(parse("\"hello world\"").unwrap(), val("hello world"));
        assert_eq!(parse("\"\"").unwrap(), val(""));

        // Escape sequences
        assert_eq!(parse("\"a\\nb\"").unwrap(), val("a\nb"));
        assert_eq!(parse("\"a\\tb\"").unwrap(), val("a\tb"));
        assert_eq!(parse("\"a\\rb\"").unwrap(), val("a\rb"));
        assert_eq!(parse("\"a\\\"b\"").unwrap(), val("a\"b"));
        assert_eq!(parse("\"a\\\\b\"").unwrap(), val("a\\b"));

        // Unknown escapes are parse errors
        assert!(parse("\"bad\\xescape\"").is_err());

        // Unterminated strings
        assert!(parse("\"unterminated").is_err());
        assert!(parse("\"ends with backslash\\").is_err());
        assert!(parse("\"test\\\"").is_err());
    }

    #[test]
    fn test_parse_char() {
        assert_eq!(parse("#\\a").unwrap(), Value::Char('a'));
        assert_eq!(parse("#\\Z").unwrap(), Value::Char('Z'));
        assert_eq!(parse("#\\newline").unwrap(), Value::Char('\n'));
        assert_eq!(parse("#\\space").unwrap(), Value::Char(' '));

        // Unknown spellings are parse errors
        assert!(parse("#\\ab").is_err());
        assert!(parse("#\\tab").is_err());
        assert!(parse("#\\1").is_err());
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse("#()").unwrap(), Value::Vector(vec![]));
        assert_eq!(
            parse("#(1 2 3)").unwrap(),
            Value::Vector(vec![val(1), val(2), val(3)])
        );
        assert_eq!(
            parse("#(a \"b\" #\\c)").unwrap(),
            Value::Vector(vec![sym("a"), val("b"), Value::Char('c')])
        );
        assert_eq!(
            parse("#(#(1) 2)").unwrap(),
            Value::Vector(vec![Value::Vector(vec![val(1)]), val(2)])
        );
    }

    #[test]
    fn test_parse_quote() {
        assert_eq!(
            parse("'foo").unwrap(),
            Value::List(vec![sym("quote"), sym("foo")])
        );
        assert_eq!(
            parse("'(1 2 3)").unwrap(),
            Value::List(vec![sym("quote"), val([1, 2, 3])])
        );
        assert_eq!(parse("'()").unwrap(), Value::List(vec![sym("quote"), nil()]));
        assert_eq!(
            parse("''x").unwrap(),
            Value::List(vec![
                sym("quote"),
                Value::List(vec![sym("quote"), sym("x")])
            ])
        );
    }

    #[test]
    fn test_parse_quasiquote() {
        assert_eq!(
            parse("`(1 ,x 3)").unwrap(),
            Value::List(vec![
                sym("quasiquote"),
                Value::List(vec![
                    val(1),
                    Value::List(vec![sym("unquote"), sym("x")]),
                    val(3),
                ]),
            ])
        );
        assert_eq!(
            parse("`()").unwrap(),
            Value::List(vec![sym("quasiquote"), nil()])
        );
        assert_eq!(
            parse("`(,(+ 1 2))").unwrap(),
            Value::List(vec![
                sym("quasiquote"),
                Value::List(vec![Value::List(vec![
                    sym("unquote"),
                    Value::List(vec![sym("+"), val(1), val(2)]),
                ])]),
            ])
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse("()").unwrap(), nil());
        assert_eq!(parse("(42)").unwrap(), Value::List(vec![val(42)]));
        assert_eq!(
            parse("(1 hello \"world\" #t)").unwrap(),
            Value::List(vec![val(1), sym("hello"), val("world"), val(true)])
        );
        assert_eq!(
            parse("(+ 1 2)").unwrap(),
            Value::List(vec![sym("+"), val(1), val(2)])
        );
        assert_eq!(
            parse("((1 2) (3 4))").unwrap(),
            Value::List(vec![val([1, 2]), val([3, 4])])
        );
        assert_eq!(
            parse("(((1)))").unwrap(),
            Value::List(vec![Value::List(vec![Value::List(vec![val(1)])])])
        );
    }

    #[test]
    fn test_parse_dotted_list() {
        assert_eq!(
            parse("(1 . 2)").unwrap(),
            Value::DottedList(vec![val(1)], Box::new(val(2)))
        );
        assert_eq!(
            parse("(1 2 . 3)").unwrap(),
            Value::DottedList(vec![val(1), val(2)], Box::new(val(3)))
        );
        assert_eq!(
            parse("(a . (b c))").unwrap(),
            Value::DottedList(vec![sym("a")], Box::new(val(vec![sym("b"), sym("c")])))
        );
        // Dotted lambda parameter shape
        assert_eq!(
            parse("(f a . rest)").unwrap(),
            Value::DottedList(vec![sym("f"), sym("a")], Box::new(sym("rest")))
        );

        // An empty head is illegal
        assert!(parse("( . 2)").is_err());
    }

    #[test]
    fn test_whitespace_handling() {
        assert_eq!(parse("  42  ").unwrap(), val(42));
        assert_eq!(parse("\t#t\n").unwrap(), val(true));
        assert_eq!(parse("\r\n  foo  \t").unwrap(), sym("foo"));
        assert_eq!(parse("( 1   2\t\n3 )").unwrap(), val([1, 2, 3]));
        assert_eq!(parse("(   )").unwrap(), nil());
        assert_eq!(parse("(\t\n)").unwrap(), nil());
    }

    #[test]
    fn test_error_cases() {
        // Mismatched parentheses
        assert!(parse("(1 2 3").is_err());
        assert!(parse("1 2 3)").is_err());
        assert!(parse("((1 2)").is_err());

        // Empty input
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());

        // Invalid characters at start
        assert!(parse(")").is_err());
        assert!(parse(",x").is_err());

        // Multiple expressions are rejected by the single-expression entry
        assert!(parse("1 2").is_err());
        assert!(parse("(+ 1 2) (+ 3 4)").is_err());
    }

    #[test]
    fn test_parse_all() {
        assert_eq!(parse_all("").unwrap(), vec![]);
        assert_eq!(parse_all("  \n ").unwrap(), vec![]);
        assert_eq!(
            parse_all("1 2 3").unwrap(),
            vec![val(1), val(2), val(3)]
        );
        assert_eq!(
            parse_all("(define x 1)\n(+ x 1)\n").unwrap(),
            vec![
                Value::List(vec![sym("define"), sym("x"), val(1)]),
                Value::List(vec![sym("+"), sym("x"), val(1)]),
            ]
        );

        assert!(parse_all("(define x 1) (oops").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        // Parsing the printed form of a parsed value gives the value back
        let sources = vec![
            "42",
            "-7",
            "3.14",
            "3/4",
            "1.0+2.0i",
            "\"a\\nb\"",
            "#\\a",
            "#\\space",
            "#t",
            "#f",
            "foo",
            "(1 2 3)",
            "(1 2 . 3)",
            "#(1 #(2) \"x\")",
            "(quote (a b))",
        ];

        for source in sources {
            let parsed = parse(source).unwrap();
            let reparsed = parse(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {}", source);
        }
    }
}
