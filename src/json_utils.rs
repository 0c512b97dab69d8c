use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

// =============== Streaming JSON structure discovery ===============

/// Type of a JSON node found by the stream parser.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    /// Exclusive end, for slicing.
    pub fn end_exclusive(&self) -> usize {
        self.end + 1
    }

    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end_exclusive())
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Byte-level scanner state shared by the one-shot and incremental parsers.
#[derive(Debug, Default)]
struct Scanner {
    stack: Vec<Frame>,
    in_string: bool,
    escape: bool,
}

/// What closing a structure produced.
enum Closed {
    Root(ObjCoords),
    /// A structure nested directly inside a root-level array.
    Element(ObjCoords),
    Nested,
}

impl Scanner {
    fn step(&mut self, idx: usize, b: u8) -> Option<Closed> {
        if self.in_string {
            if self.escape {
                self.escape = false;
                return None;
            }
            match b {
                b'\\' => self.escape = true,
                b'"' => self.in_string = false,
                _ => {}
            }
            return None;
        }

        let kind = match b {
            b'"' => {
                self.in_string = true;
                return None;
            }
            b'{' => {
                self.stack.push(Frame { start: idx, kind: NodeType::Object, children: Vec::new() });
                return None;
            }
            b'[' => {
                self.stack.push(Frame { start: idx, kind: NodeType::Array, children: Vec::new() });
                return None;
            }
            b'}' => NodeType::Object,
            b']' => NodeType::Array,
            _ => return None,
        };

        let frame = self.stack.pop()?;
        if frame.kind != kind {
            // Unbalanced bracket; drop the frame
            return None;
        }
        let node = ObjCoords::new(frame.start, idx, kind, frame.children);
        let depth = self.stack.len();
        match self.stack.last_mut() {
            None => Some(Closed::Root(node)),
            Some(parent) => {
                let is_element = depth == 1 && parent.kind == NodeType::Array;
                parent.children.push(node.clone());
                Some(if is_element { Closed::Element(node) } else { Closed::Nested })
            }
        }
    }
}

/// Find all JSON object/array structures in the given text. Coordinates are byte indices.
#[instrument(target = "studygen::json_stream", skip(text))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let mut scanner = Scanner::default();
    let mut results: Vec<ObjCoords> = Vec::new();

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if let Some(Closed::Root(node)) = scanner.step(i, b) {
            results.push(node);
        }
    }

    debug!(target: "studygen::json_stream", count = results.len(), "found root structures");
    results
}

/// Structures closed by one call to [`JsonStreamParser::feed`].
#[derive(Debug, Default)]
pub struct FeedResult {
    /// Closed root-level structures.
    pub roots: Vec<ObjCoords>,
    /// Closed direct children of a still-open (or just-closed) root array, in order.
    pub elements: Vec<ObjCoords>,
}

/// Stateful incremental stream parser that can be fed chunks and reports
/// structures as soon as their closing bracket arrives.
///
/// Elements of a root array are reported before the array itself closes,
/// which is what lets a caller show progress while a model is still writing.
#[derive(Debug, Default)]
pub struct JsonStreamParser {
    scanner: Scanner,
    /// Absolute offset (bytes) from the beginning of the full stream to the start of current chunk
    offset: usize,
}

impl JsonStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Feed a new chunk.
    #[instrument(target = "studygen::json_stream", skip(self, chunk), fields(chunk_len = chunk.len(), offset = self.offset))]
    pub fn feed(&mut self, chunk: &str) -> FeedResult {
        let mut result = FeedResult::default();

        for (i, &b) in chunk.as_bytes().iter().enumerate() {
            match self.scanner.step(self.offset + i, b) {
                Some(Closed::Root(node)) => result.roots.push(node),
                Some(Closed::Element(node)) => {
                    trace!(target: "studygen::json_stream", start = node.start, end = node.end, "array element closed");
                    result.elements.push(node)
                }
                Some(Closed::Nested) | None => {}
            }
        }

        self.offset += chunk.len();
        debug!(
            target: "studygen::json_stream",
            roots = result.roots.len(),
            elements = result.elements.len(),
            new_offset = self.offset,
            "feed complete"
        );
        result
    }
}

/// Locate the artifact array `Vec<T>` inside complete model output.
///
/// Strategy (in order):
/// - the whole text parses as `Vec<T>`;
/// - some structure (root first, then descending) parses as `Vec<T>`;
/// - a lone `T` anywhere is wrapped into a one-element vector.
///
/// Returns `None` when nothing matches; callers surface the raw text in that case.
#[instrument(target = "studygen::json_stream", skip(text), fields(text_len = text.len()))]
pub fn extract_array<T: DeserializeOwned>(text: &str) -> Option<Vec<T>> {
    if let Ok(v) = serde_json::from_str::<Vec<T>>(text.trim()) {
        return Some(v);
    }

    fn find_vec<T: DeserializeOwned>(text: &str, node: &ObjCoords) -> Option<Vec<T>> {
        let slice = node.slice(text)?;
        if node.kind == NodeType::Array {
            match serde_json::from_str::<Vec<T>>(slice) {
                Ok(vs) if !vs.is_empty() => return Some(vs),
                _ => {}
            }
        }
        node.children.iter().find_map(|child| find_vec::<T>(text, child))
    }

    fn find_single<T: DeserializeOwned>(text: &str, node: &ObjCoords) -> Option<T> {
        let slice = node.slice(text)?;
        if let Ok(v) = serde_json::from_str::<T>(slice) {
            return Some(v);
        }
        node.children.iter().find_map(|child| find_single::<T>(text, child))
    }

    let roots = find_json_structures(text);
    if let Some(found) = roots.iter().find_map(|node| find_vec::<T>(text, node)) {
        return Some(found);
    }
    let single = roots.iter().find_map(|node| find_single::<T>(text, node));
    if single.is_none() {
        debug!(target: "studygen::json_stream", "no artifact array found");
    }
    single.map(|v| vec![v])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Card {
        question: String,
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"[{"question":"what is { this ]"}]"#;
        let roots = find_json_structures(text);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 1);
    }

    #[test]
    fn only_direct_children_of_a_root_array_are_elements() {
        let mut scanner = Scanner::default();
        let closed: Vec<Closed> = r#"[{"a":[1]},[2]]"#
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| scanner.step(i, b))
            .collect();
        let elements = closed.iter().filter(|c| matches!(c, Closed::Element(_))).count();
        let nested = closed.iter().filter(|c| matches!(c, Closed::Nested)).count();
        assert_eq!(elements, 2);
        assert_eq!(nested, 1);
        assert!(matches!(closed.last(), Some(Closed::Root(_))));
    }

    #[test]
    fn extract_array_accepts_fenced_output() {
        let text = "Here you go:\n```json\n[{\"question\":\"a\"},{\"question\":\"b\"}]\n```";
        let cards: Vec<Card> = extract_array(text).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].question, "b");
    }

    #[test]
    fn extract_array_finds_wrapped_array() {
        let text = r#"{"cards":[{"question":"a"}]}"#;
        let cards: Vec<Card> = extract_array(text).unwrap();
        assert_eq!(cards, vec![Card { question: "a".into() }]);
    }

    #[test]
    fn extract_array_returns_none_for_prose() {
        assert!(extract_array::<Card>("I could not read the document.").is_none());
    }
}
