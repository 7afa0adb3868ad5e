//! Tokens: symbolic handles to decision variables.
//!
//! Tokens live in a [`TokenList`] arena and are referenced everywhere else
//! by [`TokenId`] handles, so the rest of the toolkit never holds direct
//! references into the list. Column assignment for the matrix form is a
//! separate concern, handled by [`TokenIndexMap`].

use std::collections::{HashMap, HashSet};

use crate::error::{MptError, MptResult};
use crate::kind::VariableKind;

/// Handle to a token inside its owning [`TokenList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(pub usize);

impl TokenId {
    pub fn new(id: usize) -> Self {
        TokenId(id)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

/// A symbolic decision variable.
///
/// Carries the declared bounds and kind from the algebraic model, plus the
/// result assigned by the most recent solve (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub name: String,
    pub kind: VariableKind,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub result: Option<f64>,
}

/// Arena of tokens in declaration order.
///
/// Ids are indices into this list and stay stable for its lifetime;
/// tokens are never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token with the natural bounds of its kind.
    pub fn add(&mut self, name: impl Into<String>, kind: VariableKind) -> TokenId {
        self.add_with_bounds(
            name,
            kind,
            kind.default_lower_bound(),
            kind.default_upper_bound(),
        )
    }

    /// Add a token with explicitly declared bounds.
    pub fn add_with_bounds(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        lower_bound: f64,
        upper_bound: f64,
    ) -> TokenId {
        let id = TokenId::new(self.tokens.len());
        self.tokens.push(Token {
            id,
            name: name.into(),
            kind,
            lower_bound,
            upper_bound,
            result: None,
        });
        id
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.value()]
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.value())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Scatter a column-indexed solution vector back onto the tokens.
    ///
    /// Tokens absent from the map (externally fixed during lowering) keep
    /// whatever result they already carry.
    pub fn set_solution(&mut self, map: &TokenIndexMap, values: &[f64]) -> MptResult<()> {
        if values.len() != map.len() {
            return Err(MptError::Validation(format!(
                "solution length ({}) does not match column count ({})",
                values.len(),
                map.len()
            )));
        }
        for (id, col) in map.iter() {
            self.tokens[id.value()].result = Some(values[col]);
        }
        Ok(())
    }

    pub fn clear_solution(&mut self) {
        for token in &mut self.tokens {
            token.result = None;
        }
    }
}

/// Bijection between tokens and contiguous column indices.
///
/// Columns preserve the token declaration order, minus any excluded
/// (externally fixed) tokens. Shared read-only across every canonical model
/// derived from one compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenIndexMap {
    columns: Vec<TokenId>,
    index: HashMap<TokenId, usize>,
}

impl TokenIndexMap {
    pub fn new(tokens: &TokenList, exclude: Option<&HashSet<TokenId>>) -> Self {
        let mut columns = Vec::with_capacity(tokens.len());
        let mut index = HashMap::with_capacity(tokens.len());
        for token in tokens.iter() {
            if exclude.is_some_and(|set| set.contains(&token.id)) {
                continue;
            }
            index.insert(token.id, columns.len());
            columns.push(token.id);
        }
        Self { columns, index }
    }

    /// Column index of a token, `None` if it was excluded.
    pub fn col_of(&self, id: TokenId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn token_at(&self, col: usize) -> Option<TokenId> {
        self.columns.get(col).copied()
    }

    /// Iterate `(token, column)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, usize)> + '_ {
        self.columns.iter().enumerate().map(|(col, id)| (*id, col))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_tokens() -> TokenList {
        let mut tokens = TokenList::new();
        tokens.add("x", VariableKind::Continuous);
        tokens.add("y", VariableKind::UContinuous);
        tokens.add("z", VariableKind::Binary);
        tokens
    }

    #[test]
    fn test_token_ids_are_stable_indices() {
        let tokens = three_tokens();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.token(TokenId::new(1)).name, "y");
        assert_eq!(tokens.token(TokenId::new(2)).kind, VariableKind::Binary);
    }

    #[test]
    fn test_index_map_preserves_order() {
        let tokens = three_tokens();
        let map = TokenIndexMap::new(&tokens, None);
        assert_eq!(map.len(), 3);
        for (col, token) in tokens.iter().enumerate() {
            assert_eq!(map.col_of(token.id), Some(col));
            assert_eq!(map.token_at(col), Some(token.id));
        }
    }

    #[test]
    fn test_index_map_exclusion_keeps_columns_contiguous() {
        let tokens = three_tokens();
        let excluded: HashSet<TokenId> = [TokenId::new(1)].into_iter().collect();
        let map = TokenIndexMap::new(&tokens, Some(&excluded));
        assert_eq!(map.len(), 2);
        assert_eq!(map.col_of(TokenId::new(0)), Some(0));
        assert_eq!(map.col_of(TokenId::new(1)), None);
        assert_eq!(map.col_of(TokenId::new(2)), Some(1));
    }

    #[test]
    fn test_empty_map_is_valid() {
        let tokens = TokenList::new();
        let map = TokenIndexMap::new(&tokens, None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_solution_scatter() {
        let mut tokens = three_tokens();
        let excluded: HashSet<TokenId> = [TokenId::new(0)].into_iter().collect();
        let map = TokenIndexMap::new(&tokens, Some(&excluded));

        tokens.set_solution(&map, &[4.0, 1.0]).unwrap();
        assert_eq!(tokens.token(TokenId::new(0)).result, None);
        assert_eq!(tokens.token(TokenId::new(1)).result, Some(4.0));
        assert_eq!(tokens.token(TokenId::new(2)).result, Some(1.0));

        assert!(tokens.set_solution(&map, &[1.0]).is_err());

        tokens.clear_solution();
        assert!(tokens.iter().all(|t| t.result.is_none()));
    }
}
