// Token filter
//
// The parser only looks at default-channel tokens, but diagnostics and a few
// grammar rules need to know what was skipped between two of them (e.g. no
// whitespace is allowed around the `:` of `cluster:index`). The filter keeps
// the full token list and an index of the significant ones.

use crate::token::Token;

#[derive(Debug, Clone)]
pub struct TokenFilter<'a> {
    tokens: Vec<Token<'a>>,
    significant: Vec<usize>,
}

impl<'a> TokenFilter<'a> {
    #[must_use]
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_hidden())
            .map(|(i, _)| i)
            .collect();
        Self {
            tokens,
            significant,
        }
    }

    /// Default-channel tokens paired with their index in [`Self::all`].
    pub fn significant(&self) -> impl Iterator<Item = (usize, &Token<'a>)> + '_ {
        self.significant.iter().map(|&i| (i, &self.tokens[i]))
    }

    /// Number of default-channel tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.significant.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.significant.is_empty()
    }

    /// The `i`-th default-channel token.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Token<'a>> {
        self.original_index(i).map(|idx| &self.tokens[idx])
    }

    /// Index in the unfiltered stream of the `i`-th default-channel token.
    #[must_use]
    pub fn original_index(&self, i: usize) -> Option<usize> {
        self.significant.get(i).copied()
    }

    /// Hidden tokens between the `i`-th and `j`-th default-channel tokens.
    #[must_use]
    pub fn hidden_between(&self, i: usize, j: usize) -> &[Token<'a>] {
        match (self.original_index(i), self.original_index(j)) {
            (Some(a), Some(b)) if a < b => &self.tokens[a + 1..b],
            _ => &[],
        }
    }

    /// Every token, hidden ones included, in source order.
    #[must_use]
    pub fn all(&self) -> &[Token<'a>] {
        &self.tokens
    }

    #[must_use]
    pub fn into_tokens(self) -> Vec<Token<'a>> {
        self.tokens
    }
}
