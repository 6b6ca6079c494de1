use opsh_parser::{parse, TokenKind};

const LINES: &[&str] = &[
    "widgets list",
    "widgets download abc --site siteUS",
    "themes download --site siteUS && widgets list",
    "sites list || sites create \"my shop\"",
    "config set -k theme -v dark",
    "&&",
    "|| widgets",
    "a && && b",
];

#[test]
fn parse_sample_lines() {
    for line in LINES {
        let ast = parse(line);
        let k = line.split(' ').filter(|w| *w == "&&" || *w == "||").count();
        assert_eq!(ast.operators().count(), k, "{line}");
    }
}

#[test]
fn first_token_of_every_context_is_an_invocation() {
    for line in LINES {
        for ctx in parse(line).contexts() {
            assert_eq!(ctx.tokens[0].kind, TokenKind::CommandInvocation, "{line}");
        }
    }
}

#[test]
fn empty_contexts_are_not_emitted() {
    let ast = parse("a && && b");
    assert_eq!(ast.contexts().count(), 2);
    assert_eq!(ast.operators().count(), 2);
}
