use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use filter_ql::lexer::LexError;
use filter_ql::lookup::LookupTranslator;
use filter_ql::matcher::Matcher;
use filter_ql::parser::{Expected, Found};
use filter_ql::sql::SqlTranslator;
use filter_ql::{compile, Comparison, Error, Limits, MatchMode, Predicate, QueryLanguage};
use rstest::rstest;

fn exact(field: &str, value: &str) -> Predicate {
    Predicate::exact(field, value)
}

fn regex(field: &str, value: &str) -> Predicate {
    Predicate::regex(field, value)
}

#[rstest]
#[case::simple_eq(r#"hi = "yes""#, exact("hi", "yes"))]
#[case::simple_neq(r#"hi != "yes""#, Predicate::not_exact("hi", "yes"))]
#[case::simple_re(r#"hi =~ "yes.*""#, regex("hi", "yes.*"))]
#[case::simple_nre(r#"hi !~ "yes.*""#, Predicate::not_regex("hi", "yes.*"))]
#[case::whitespace_eq(r#"hi   =   "yes""#, exact("hi", "yes"))]
#[case::whitespace_neq(r#"hi   !=   "yes""#, Predicate::not_exact("hi", "yes"))]
#[case::whitespace_re(r#"hi   =~   "yes.*""#, regex("hi", "yes.*"))]
#[case::whitespace_nre(r#"hi   !~   "yes.*""#, Predicate::not_regex("hi", "yes.*"))]
#[case::and_eq(r#"hi = "yes" and yes = "no""#, exact("hi", "yes") & exact("yes", "no"))]
#[case::and_neq(
    r#"hi != "yes" and yes = "no""#,
    Predicate::not_exact("hi", "yes") & exact("yes", "no")
)]
#[case::and_re(r#"hi =~ "yes.*" and yes = "no""#, regex("hi", "yes.*") & exact("yes", "no"))]
#[case::and_nre(
    r#"hi !~ "yes.*" and yes = "no""#,
    Predicate::not_regex("hi", "yes.*") & exact("yes", "no")
)]
#[case::or_eq(r#"hi = "yes" or yes = "no""#, exact("hi", "yes") | exact("yes", "no"))]
#[case::or_neq(
    r#"hi != "yes" or yes = "no""#,
    Predicate::not_exact("hi", "yes") | exact("yes", "no")
)]
#[case::or_re(r#"hi =~ "yes.*" or yes = "no""#, regex("hi", "yes.*") | exact("yes", "no"))]
#[case::or_nre(
    r#"hi !~ "yes.*" or yes = "no""#,
    Predicate::not_regex("hi", "yes.*") | exact("yes", "no")
)]
#[case::bracket_then_or(
    r#"(a = "1" and b = "2") or a = "1""#,
    (exact("a", "1") & exact("b", "2")) | exact("a", "1")
)]
#[case::multi_brackets(
    r#"
    (hi = "yes" and location != "UK")
    or (yes !~ "okay" or no = "wow")
    or (a = "1" and b =    "3" and c         = "4")
    or a = "1"
    "#,
    (exact("hi", "yes") & Predicate::not_exact("location", "UK"))
        | (Predicate::not_regex("yes", "okay") | exact("no", "wow"))
        | (exact("a", "1") & exact("b", "3") & exact("c", "4"))
        | exact("a", "1")
)]
fn compiles(#[case] query: &str, #[case] expected: Predicate) {
    assert_eq!(compile(query).unwrap(), expected);
}

#[test]
fn comparison_fields_are_populated() {
    let Predicate::Comparison(cmp) = compile(r#"hi !~ "yes.*""#).unwrap() else {
        panic!("Expected a comparison");
    };
    assert_eq!(
        cmp,
        Comparison {
            field: "hi".to_string(),
            mode: MatchMode::Regex,
            value: "yes.*".to_string(),
            negated: true,
        }
    );
}

#[rstest]
#[case(r#"a="1"or b="2"and c="3""#)]
#[case(r#"  a  =  "1"  or  b  =  "2"  and  c  =  "3"  "#)]
#[case("a\t=\n\"1\"\r\nor b= \"2\" and\tc =\"3\"")]
fn whitespace_is_insignificant(#[case] query: &str) {
    assert_eq!(
        compile(query).unwrap(),
        compile(r#"a = "1" or b = "2" and c = "3""#).unwrap()
    );
}

#[test]
fn whitespace_inside_strings_is_kept() {
    assert_eq!(compile(r#"a = " x  y ""#).unwrap(), exact("a", " x  y "));
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(
        compile(r#"a = "1" or b = "2" and c = "3""#).unwrap(),
        compile(r#"a = "1" or (b = "2" and c = "3")"#).unwrap()
    );
    assert_ne!(
        compile(r#"a = "1" or b = "2" and c = "3""#).unwrap(),
        compile(r#"(a = "1" or b = "2") and c = "3""#).unwrap()
    );
}

#[rstest]
#[case(r#"a = "1" and b = "2" and c = "3""#, r#"(a = "1" and b = "2") and c = "3""#)]
#[case(r#"a = "1" or b = "2" or c = "3""#, r#"(a = "1" or b = "2") or c = "3""#)]
#[case(r#"a = "1" or b = "2" and c = "3""#, r#"(a = "1") or ((b = "2" and c = "3"))"#)]
#[case(r#"a = "1" and b = "2""#, r#"((a = "1" and b = "2"))"#)]
fn redundant_brackets_are_a_no_op(#[case] plain: &str, #[case] bracketed: &str) {
    assert_eq!(compile(plain).unwrap(), compile(bracketed).unwrap());
}

#[rstest]
#[case(r#"v = "say \"hi\"""#, r#"say "hi""#)]
#[case(r#"v = "back\\slash""#, r"back\slash")]
#[case(r#"v = "\\\"""#, r#"\""#)]
#[case(r#"v = "ünïcödé ✓""#, "ünïcödé ✓")]
#[case(r#"v = """#, "")]
fn string_literals_are_decoded(#[case] query: &str, #[case] value: &str) {
    assert_eq!(compile(query).unwrap(), exact("v", value));
}

#[rstest]
#[case::unquoted_value("hi = yes")]
#[case::unknown_operator(r#"hi == "yes""#)]
#[case::unbalanced_open(r#"(hi = "yes""#)]
#[case::unbalanced_close(r#"hi = "yes")"#)]
#[case::empty("")]
#[case::blank("   ")]
#[case::lone_bang(r#"hi ! "yes""#)]
#[case::unterminated(r#"hi = "yes"#)]
#[case::bad_escape(r#"hi = "\n""#)]
#[case::dotted_field(r#"a.b = "1""#)]
#[case::numeric_comparison(r#"n > "1""#)]
#[case::single_quotes("hi = 'yes'")]
#[case::not_keyword(r#"not hi = "yes""#)]
#[case::keyword_as_field(r#"and = "yes""#)]
#[case::trailing_connective(r#"hi = "yes" or"#)]
#[case::missing_connective(r#"hi = "yes" yes = "no""#)]
#[case::empty_brackets("()")]
fn malformed_queries_fail_closed(#[case] query: &str) {
    let result = compile(query);
    assert!(
        matches!(result, Err(Error::Lex(_) | Error::Syntax(_))),
        "{query:?} gave {result:?}"
    );
}

#[test]
fn errors_carry_expected_and_found() {
    let Err(Error::Syntax(err)) = compile(r#"(hi = "yes""#) else {
        panic!("Expected a syntax error");
    };
    assert_eq!(err.expected, Expected::ClosingParen);
    assert_eq!(err.found, Found::EndOfInput);
    assert_eq!(
        err.to_string(),
        "expected `and`, `or` or `)`, found end of input at byte 11"
    );

    assert_eq!(
        compile(r#"hi = "yes"#),
        Err(Error::Lex(LexError::UnterminatedString { position: 5 }))
    );
}

#[test]
fn adversarial_nesting_is_rejected() {
    let query = format!("{}a = \"1\"{}", "(".repeat(10_000), ")".repeat(10_000));
    let language = QueryLanguage::new(Limits {
        max_query_len: usize::MAX,
        ..Limits::default()
    });
    assert!(matches!(
        language.compile(&query),
        Err(Error::RecursionLimitExceeded { limit: 64, .. })
    ));
}

#[test]
fn oversized_queries_are_rejected() {
    let query = format!(r#"a = "{}""#, "x".repeat(filter_ql::config::DEFAULT_MAX_QUERY_LEN));
    assert!(matches!(compile(&query), Err(Error::QueryTooLong { .. })));
}

fn or_of_exact(count: usize) -> String {
    (0..count)
        .map(|i| format!(r#"f{} = "{i}""#, i % 7))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn or_of_regex(count: usize) -> String {
    (0..count)
        .map(|i| format!(r#"f{i} =~ "^{i}$""#))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn and_of_not_exact(count: usize) -> String {
    (0..count)
        .map(|i| format!(r#"id != "{i}""#))
        .collect::<Vec<_>>()
        .join(" and ")
}

fn alternating(count: usize) -> String {
    let mut query = String::new();
    for i in 0..count {
        if i > 0 {
            query.push_str(if i % 2 == 0 { " or " } else { " and " });
        }
        query.push_str(&format!(r#"f{i} != "{i}""#));
    }
    query
}

fn bracketed_pairs(count: usize) -> String {
    let mut operands: Vec<_> = (0..count / 2)
        .map(|i| format!(r#"(a{i} = "{i}" or b{i} !~ "{i}")"#))
        .collect();
    if count % 2 == 1 {
        operands.push(r#"tail !~ "x""#.to_string());
    }
    operands.join(" and ")
}

#[rstest]
#[case::or_of_exact(or_of_exact, false)]
#[case::or_of_regex(or_of_regex, false)]
#[case::and_of_not_exact(and_of_not_exact, true)]
#[case::alternating(alternating, true)]
#[case::bracketed_pairs(bracketed_pairs, true)]
fn longest_chains_reach_every_backend(
    #[case] build: fn(usize) -> String,
    #[case] matches_empty_record: bool,
) {
    let limits = Limits::default();
    let language = QueryLanguage::new(limits);

    let predicate = language.compile(&build(limits.max_comparisons)).unwrap();
    assert_eq!(predicate.comparisons().len(), limits.max_comparisons);
    assert_eq!(compile(&predicate.to_string()).unwrap(), predicate);

    let result = SqlTranslator::new().compile(&predicate);
    assert!(result.sql.starts_with("SELECT * FROM"));
    let (_, values) = SqlTranslator::new().build(&predicate);
    assert_eq!(values.0.len(), limits.max_comparisons);

    let matcher = Matcher::new(&predicate).unwrap();
    assert_eq!(
        matcher.matches(&HashMap::<String, String>::new()),
        matches_empty_record
    );

    let tree = predicate.translate(&mut LookupTranslator::default());
    assert_eq!(tree.lookups().len(), limits.max_comparisons);

    assert!(matches!(
        language.compile(&build(limits.max_comparisons + 1)),
        Err(Error::TooManyComparisons { limit, .. }) if limit == limits.max_comparisons
    ));
}

#[rstest]
#[case::default_limits(Limits::default())]
#[case::unbounded_length(Limits { max_query_len: usize::MAX, ..Limits::default() })]
fn chains_filling_the_query_fail_closed(#[case] limits: Limits) {
    let link = r#"a="1"and "#;
    let query = format!(
        r#"{}a="1""#,
        link.repeat(Limits::default().max_query_len / link.len() - 1)
    );
    assert!(query.len() <= Limits::default().max_query_len);

    assert!(matches!(
        QueryLanguage::new(limits).compile(&query),
        Err(Error::TooManyComparisons { .. })
    ));
}

#[rstest]
#[case(r#"hi = "yes""#)]
#[case(r#"hi !~ "a\"b\\c""#)]
#[case(r#"a = "1" or b = "2" and c = "3""#)]
#[case(r#"(a = "1" or b = "2") and (c != "3" or d =~ "4")"#)]
#[case(r#"a = "1" and (b = "2" and c = "3")"#)]
#[case(r#"a = "1" or (b = "2" or c = "3")"#)]
fn display_round_trips(#[case] query: &str) {
    let predicate = compile(query).unwrap();
    assert_eq!(compile(&predicate.to_string()).unwrap(), predicate);
}

#[test]
fn one_language_serves_many_threads() {
    let language = Arc::new(QueryLanguage::default());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let language = Arc::clone(&language);
            thread::spawn(move || {
                let query = format!(r#"id = "{i}" or group =~ "^g{i}$""#);
                language.compile(&query).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let predicate = handle.join().unwrap();
        assert_eq!(
            predicate,
            exact("id", &i.to_string()) | regex("group", &format!("^g{i}$"))
        );
    }
}
