use quick_xml::Reader;
use quick_xml::events::Event;

use crate::{Error, Result};

const ATTR_LIST: &str = "attrList";

/// One `<attrList>` entry from a device attribute listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AttributeEntry {
    pub id: String,
    pub name: String,
    pub value: String,
}

struct Open {
    name: String,
    has_children: bool,
}

/// Flattened view of a gateway response: the text of every leaf element keyed
/// by its path below the root (`devList/devId`), plus the root's `attrList`
/// children. Text is kept verbatim; record streams may end in spaces.
#[derive(Debug, Default)]
pub(crate) struct Document {
    leaves: Vec<(String, String)>,
    attributes: Vec<AttributeEntry>,
}

impl Document {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut doc = Document::default();
        let mut stack: Vec<Open> = Vec::new();
        let mut current: Option<AttributeEntry> = None;
        let mut text = String::new();
        let mut saw_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    doc.open(&mut stack, &mut current, name);
                    saw_root = true;
                    text.clear();
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    doc.open(&mut stack, &mut current, name);
                    saw_root = true;
                    text.clear();
                    doc.close(&mut stack, &mut current, &mut text);
                }
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::End(_) => doc.close(&mut stack, &mut current, &mut text),
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(Error::Decode("response contains no XML elements".to_string()));
        }
        Ok(doc)
    }

    fn open(&mut self, stack: &mut Vec<Open>, current: &mut Option<AttributeEntry>, name: String) {
        if let Some(parent) = stack.last_mut() {
            parent.has_children = true;
        }
        if stack.len() == 1 && name == ATTR_LIST {
            *current = Some(AttributeEntry::default());
        }
        stack.push(Open {
            name,
            has_children: false,
        });
    }

    fn close(
        &mut self,
        stack: &mut Vec<Open>,
        current: &mut Option<AttributeEntry>,
        text: &mut String,
    ) {
        let depth = stack.len();
        if depth == 2 && stack[1].name == ATTR_LIST {
            if let Some(entry) = current.take() {
                self.attributes.push(entry);
            }
        } else if depth == 3
            && stack[1].name == ATTR_LIST
            && let Some(entry) = current.as_mut()
        {
            match stack[2].name.as_str() {
                "id" => entry.id = text.clone(),
                "name" => entry.name = text.clone(),
                "value" => entry.value = text.clone(),
                _ => {}
            }
        }

        if let Some(open) = stack.last()
            && !open.has_children
            && depth > 1
        {
            let path = stack[1..]
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join("/");
            self.leaves.push((path, std::mem::take(text)));
        }
        stack.pop();
        text.clear();
    }

    /// Text of the first leaf at `path`, like ElementTree's `findtext`.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.leaves
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, t)| t.as_str())
    }

    pub fn attributes(&self) -> &[AttributeEntry] {
        &self.attributes
    }
}
