use parsegen::{Action, Error, Grammar, SymbolID, SymbolKind};

const CALC: &str = r#"
calc {
    %whitespace "[ \t\r\n]*";
    %left '+' '-';
    %left '*' '/';
    %none integer;
    stmts: stmts stmt | stmt ;
    stmt: expr ';' [result];
    expr: expr '+' expr [add]
        | expr '-' expr [sub]
        | expr '*' expr [mul]
        | expr '/' expr [div]
        | '(' expr ')' [group]
        | integer [int];
    integer: "[0-9]+";
}
"#;

const XML: &str = r#"
xml {
    %whitespace "[ \t\r\n]*";
    %left '<' '>';
    %left name;

    document: prolog element [document];
    prolog: '<?xml' attributes '?>' [prolog] | ;
    element: '<' name attributes '/>' [short_element]
           | '<' name attributes '>' content '</' name '>' [long_element];
    attributes: attributes attribute [add_attribute] | ;
    attribute: name '=' value [attribute];
    content: content element [add_element] | content value [add_text] | ;
    name: "[A-Za-z_][A-Za-z0-9_\-\.:]*";
    value: "\"[^\"]*\"";
}
"#;

/// Scans `input` to the end, skipping whitespace tokens, and returns the
/// matched slices with their terminal names.
fn tokenize<'i>(g: &Grammar, input: &'i str) -> Vec<(&'i str, String)> {
    let mut tokens = vec![];
    let mut offset = 0;
    while offset < input.len() {
        let scanned = g.scan(input, offset).expect("scanner got stuck");
        assert!(!scanned.text.is_empty(), "empty match would not progress");
        offset += scanned.text.len();
        if scanned.token != SymbolID::WHITESPACE.index() {
            let name = g.symbol(g.token_symbol(scanned.token)).name.clone();
            tokens.push((scanned.text, name));
        }
    }
    tokens
}

#[test]
fn calc_compiles_without_conflicts() {
    let g = Grammar::compile(CALC).unwrap();

    let plus = g.symbol_id("+").unwrap();
    let star = g.symbol_id("*").unwrap();
    assert!(g.symbol(star).precedence > g.symbol(plus).precedence);

    // The optimizer folded `integer` into the regex terminal, carrying the
    // %none precedence along.
    assert!(g
        .symbols()
        .all(|(_, s)| !(s.name == "integer" && s.kind == SymbolKind::NonTerminal)));
    let digits = g.symbol_id("[0-9]+").unwrap();
    assert!(g.symbol(digits).is_terminal());
    assert_eq!(g.symbol(digits).precedence, 3);

    // expr : expr '+' expr borrows its precedence from '+'.
    let (_, add) = g
        .productions()
        .find(|(_, p)| p.action.as_deref() == Some("add"))
        .unwrap();
    assert_eq!(add.precedence(&g), g.symbol(plus).precedence);
    assert_eq!(add.precedence_symbol, Some(plus));
}

#[test]
fn calc_scanner_tokenizes_statements() {
    let g = Grammar::compile(CALC).unwrap();
    let tokens = tokenize(&g, "12 + 3*(40 / 5);");
    let texts: Vec<_> = tokens.iter().map(|(text, _)| *text).collect();
    assert_eq!(texts, ["12", "+", "3", "*", "(", "40", "/", "5", ")", ";"]);
    assert_eq!(tokens[0].1, "[0-9]+");
    assert_eq!(tokens[1].1, "+");
}

#[test]
fn compilation_is_deterministic() {
    let a = Grammar::compile(CALC).unwrap();
    let b = Grammar::compile(CALC).unwrap();
    assert_eq!(format!("{}", a), format!("{}", b));
    assert_eq!(
        format!("{}", a.automaton()),
        format!("{}", b.automaton())
    );
    assert_eq!(format!("{:?}", a.scanner()), format!("{:?}", b.scanner()));
}

#[test]
fn xml_compiles_without_conflicts() {
    let g = Grammar::compile(XML).unwrap();

    // %left name survives the alias collapse on the name regex.
    let name = g.symbol_id("[A-Za-z_][A-Za-z0-9_\\-\\.:]*").unwrap();
    assert!(g.symbol(name).is_terminal());
    assert_eq!(g.symbol(name).precedence, 2);

    let tokens = tokenize(&g, r#"<?xml version="1.0"?><a href="x">"hi"</a>"#);
    let texts: Vec<_> = tokens.iter().map(|(text, _)| *text).collect();
    assert_eq!(
        texts,
        [
            "<?xml", "version", "=", "\"1.0\"", "?>", "<", "a", "href", "=", "\"x\"", ">",
            "\"hi\"", "</", "a", ">",
        ]
    );
}

#[test]
fn undeclared_operator_conflicts_are_fatal() {
    let err = Grammar::compile("g { expr : expr '+' expr | integer; integer: \"[0-9]+\"; }");
    assert!(matches!(err, Err(Error::ShiftReduceConflict { .. })));
}

#[test]
fn every_state_is_deterministic_in_the_consumed_symbol() {
    for source in [CALC, XML] {
        let g = Grammar::compile(source).unwrap();
        for (id, _) in g.states() {
            let mut seen = vec![];
            for t in g.transitions(id) {
                assert!(!seen.contains(&t.symbol));
                seen.push(t.symbol);
            }
        }
    }
}

#[test]
fn shift_targets_and_reduce_targets_stay_in_range() {
    let g = Grammar::compile(CALC).unwrap();
    let states = g.states().count();
    let productions = g.productions().count();
    for (id, _) in g.states() {
        for t in g.transitions(id) {
            match t.action {
                Action::Shift(next) => assert!(next.index() < states),
                Action::Reduce(p) => assert!(p.index() < productions),
            }
        }
    }
}
