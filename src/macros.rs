/// Declare a [`Grammar`](crate::Grammar) as a list of named states.
///
/// ```
/// use hilex::{LexerConfig, RuleDef, grammar};
///
/// let g = grammar!("Ini", {
///     "root" => [
///         RuleDef::new(r"\[").token("Keyword").push("section"),
///         RuleDef::new(r"(?s).").token("Text"),
///     ],
///     "section" => [
///         RuleDef::new(r"\]").token("Keyword").pop(1),
///         RuleDef::new(r"[^\]]+").token("NameNamespace"),
///     ],
/// });
/// assert_eq!(g.states.len(), 2);
///
/// let g = grammar!(config: LexerConfig::new("Ini").filename("*.ini"), {
///     "root" => [RuleDef::new(r"(?s).").token("Text")],
/// });
/// assert_eq!(g.config.filenames, ["*.ini"]);
/// ```
#[macro_export]
macro_rules! grammar {
    (config: $config:expr, { $($state:expr => [ $($rule:expr),* $(,)? ]),* $(,)? }) => {{
        let grammar = $crate::Grammar::with_config($config);
        $( let grammar = grammar.state($state, vec![ $($rule),* ]); )*
        grammar
    }};
    ($name:expr, { $($state:expr => [ $($rule:expr),* $(,)? ]),* $(,)? }) => {
        $crate::grammar!(config: $crate::LexerConfig::new($name), { $($state => [ $($rule),* ]),* })
    };
}
