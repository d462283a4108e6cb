//! CSS-style selector parsing and matching.
//!
//! Supported grammar:
//!
//! ```text
//! list      := complex ( "," complex )*
//! complex   := compound ( combinator compound )*
//! combinator:= whitespace | ">"
//! compound  := ( tag | "*" )? ( "#" ident | "." ident | attr )*
//! attr      := "[" ident ( "=" ( ident | quoted ) )? "]"
//! ```

use crate::error::{PluginError, Result};

use super::element::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if el.tag() != tag {
                return false;
            }
        }
        if !self.ids.is_empty() {
            let id = el.id();
            if !self.ids.iter().all(|want| id.as_deref() == Some(want.as_str())) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|attr| match attr {
            AttrMatch::Exists(name) => el.attribute(name).is_some(),
            AttrMatch::Equals(name, value) => el.attribute(name).as_deref() == Some(value),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A chain of compounds; `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, el: &Element) -> bool {
        self.matches_at(self.compounds.len() - 1, el)
    }

    fn matches_at(&self, idx: usize, el: &Element) -> bool {
        if !self.compounds[idx].matches(el) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => el
                .parent()
                .map_or(false, |parent| self.matches_at(idx - 1, &parent)),
            Combinator::Descendant => {
                let mut current = el.parent();
                while let Some(ancestor) = current {
                    if self.matches_at(idx - 1, &ancestor) {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
        }
    }
}

/// A parsed, comma separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Complex>,
}

impl Selector {
    /// Parse a selector string.
    ///
    /// # Errors
    /// `PluginError::Selector` describing the first syntax problem found.
    pub fn parse(input: &str) -> Result<Self> {
        let groups = Parser::new(input).parse_list()?;
        Ok(Self {
            source: input.to_string(),
            groups,
        })
    }

    /// The original selector text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `el` matches any group of this selector.
    pub fn matches(&self, el: &Element) -> bool {
        self.groups.iter().any(|group| group.matches(el))
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> PluginError {
        PluginError::Selector {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>> {
        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            groups.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(groups)
    }

    fn parse_complex(&mut self) -> Result<Complex> {
        let first = self
            .parse_compound()?
            .ok_or_else(|| self.error("expected a selector"))?;
        let mut complex = Complex {
            compounds: vec![first],
            combinators: Vec::new(),
        };

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            let next = self
                .parse_compound()?
                .ok_or_else(|| self.error("dangling combinator"))?;
            complex.combinators.push(combinator);
            complex.compounds.push(next);
        }

        Ok(complex)
    }

    /// Returns `None` when no simple selector was consumed.
    fn parse_compound(&mut self) -> Result<Option<Compound>> {
        let mut compound = Compound::default();
        let mut consumed = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                consumed = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                consumed = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
            consumed = true;
        }

        Ok(consumed.then_some(compound))
    }

    fn parse_ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().map_or(false, is_ident_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attr(&mut self) -> Result<AttrMatch> {
        self.skip_ws();
        let name = self.parse_ident()?;
        self.skip_ws();
        let attr = match self.peek() {
            Some(']') => AttrMatch::Exists(name),
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                let value = match self.peek() {
                    Some(q @ ('"' | '\'')) => self.parse_quoted(q)?,
                    _ => self.parse_ident()?,
                };
                self.skip_ws();
                AttrMatch::Equals(name, value)
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        if self.peek() != Some(']') {
            return Err(self.error("unterminated attribute selector"));
        }
        self.pos += 1;
        Ok(attr)
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string"))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    /// <div.page><ul.list><li#one.item/><li#two.item[data-active=yes]/></ul><p.item/></div>
    fn tree() -> (Element, Vec<Element>) {
        let page = Element::new("div").with_class("page");
        let list = Element::new("ul").with_class("list");
        let one = Element::new("li").with_id("one").with_class("item");
        let two = Element::new("li")
            .with_id("two")
            .with_class("item")
            .with_attribute("data-active", "yes");
        let para = Element::new("p").with_class("item");
        page.append_child(&list);
        list.append_child(&one);
        list.append_child(&two);
        page.append_child(&para);
        (page.clone(), vec![page, list, one, two, para])
    }

    fn matching(selector: &str) -> Vec<String> {
        let (root, _) = tree();
        let sel = Selector::parse(selector).unwrap();
        root.descendants_inclusive()
            .into_iter()
            .filter(|el| sel.matches(el))
            .map(|el| format!("{:?}", el))
            .collect()
    }

    #[test]
    fn test_class_selector() {
        assert_eq!(matching(".item"), vec!["li#one.item", "li#two.item", "p.item"]);
    }

    #[test]
    fn test_tag_and_id() {
        assert_eq!(matching("li#two"), vec!["li#two.item"]);
        assert_eq!(matching("#missing"), Vec::<String>::new());
    }

    #[test]
    fn test_universal() {
        assert_eq!(matching("*").len(), 5);
    }

    #[test]
    fn test_attribute_selectors() {
        assert_eq!(matching("[data-active]"), vec!["li#two.item"]);
        assert_eq!(matching("[data-active=\"yes\"]"), vec!["li#two.item"]);
        assert_eq!(matching("[data-active='no']"), Vec::<String>::new());
        assert_eq!(matching("[ data-active = yes ]"), vec!["li#two.item"]);
    }

    #[test]
    fn test_descendant_and_child_combinators() {
        assert_eq!(matching(".page .item").len(), 3);
        assert_eq!(matching(".page > .item"), vec!["p.item"]);
        assert_eq!(matching(".page>ul>li"), vec!["li#one.item", "li#two.item"]);
    }

    #[test]
    fn test_selector_list() {
        assert_eq!(matching("p, #one"), vec!["li#one.item", "p.item"]);
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", ".", ".a >", "a,", "[x", "[x=\"y]", "a ! b", "#"] {
            let err = Selector::parse(bad).unwrap_err();
            assert!(
                matches!(err, PluginError::Selector { .. }),
                "expected selector error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_as_str_keeps_source() {
        let sel = Selector::parse(".tip, [data-tooltip]").unwrap();
        assert_eq!(sel.as_str(), ".tip, [data-tooltip]");
    }
}
