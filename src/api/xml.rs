// src/api/xml.rs — Parsing of <eveapi> response documents
//
// Responses look like:
//   <eveapi version="2">
//     <currentTime>2016-01-01 12:00:00</currentTime>
//     <result> ... <rowset name="jobs"><row jobID="1" .../></rowset> ... </result>
//     <cachedUntil>2016-01-01 12:15:00</cachedUntil>
//   </eveapi>
// or carry an <error code="...">message</error> element instead of <result>.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::infra::errors::EveApiError;

const EVE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A parsed XML element with its attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, EveApiError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = BTreeMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.insert(key, value);
        }
        Ok(Self {
            name,
            attrs,
            ..Default::default()
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Depth-first search for the first element matching `pred`.
    pub fn find<F>(&self, pred: &F) -> Option<&XmlElement>
    where
        F: Fn(&XmlElement) -> bool,
    {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }
}

/// Parse a document into its root element.
pub fn parse_document(body: &str) -> Result<XmlElement, EveApiError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(data.as_ref()));
                }
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| EveApiError::Other(anyhow::anyhow!("XML document has no root element")))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Parse the XML API's `YYYY-MM-DD HH:MM:SS` timestamps. Empty strings and
/// the `0001-01-01 00:00:00` placeholder mean "no date".
pub fn parse_eve_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("0001-01-01") {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, EVE_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// A successful `<eveapi>` response.
#[derive(Debug, Clone)]
pub struct XmlResult {
    pub current_time: Option<DateTime<Utc>>,
    pub cached_until: Option<DateTime<Utc>>,
    pub result: XmlElement,
}

impl XmlResult {
    /// Parse a response body. An `<error>` element becomes `EveApiError::XmlApi`.
    pub fn parse(body: &str) -> Result<Self, EveApiError> {
        let root = parse_document(body)?;
        if root.name != "eveapi" {
            return Err(EveApiError::Other(anyhow::anyhow!(
                "unexpected root element <{}>",
                root.name
            )));
        }

        if let Some(error) = root.child("error") {
            let code = error
                .attr("code")
                .and_then(|c| c.parse().ok())
                .unwrap_or(0);
            return Err(EveApiError::XmlApi {
                code,
                message: error.text.clone(),
            });
        }

        let result = root
            .child("result")
            .cloned()
            .ok_or_else(|| EveApiError::Other(anyhow::anyhow!("response has no <result>")))?;

        Ok(Self {
            current_time: root.child("currentTime").and_then(|e| parse_eve_time(&e.text)),
            cached_until: root.child("cachedUntil").and_then(|e| parse_eve_time(&e.text)),
            result,
        })
    }

    /// Whether the server-declared cache window is still open at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.cached_until.is_some_and(|until| now < until)
    }

    /// Rows of the named rowset, or an empty list if it is absent.
    pub fn rowset(&self, name: &str) -> Vec<Row<'_>> {
        let rowset = self
            .result
            .find(&|e: &XmlElement| e.name == "rowset" && e.attr("name") == Some(name));
        match rowset {
            Some(set) => set
                .children
                .iter()
                .filter(|c| c.name == "row")
                .map(Row)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First element named `name` anywhere inside `<result>`.
    pub fn element(&self, name: &str) -> Option<&XmlElement> {
        self.result.find(&|e: &XmlElement| e.name == name)
    }
}

/// A `<row>` with typed attribute accessors.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a>(pub &'a XmlElement);

impl<'a> Row<'a> {
    pub fn str(&self, key: &str) -> Result<&'a str, EveApiError> {
        self.0
            .attrs
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| EveApiError::Other(anyhow::anyhow!("row is missing attribute '{key}'")))
    }

    pub fn i64(&self, key: &str) -> Result<i64, EveApiError> {
        let raw = self.str(key)?;
        raw.trim().parse().map_err(|_| {
            EveApiError::Other(anyhow::anyhow!("attribute '{key}' is not an integer: {raw}"))
        })
    }

    pub fn f64(&self, key: &str) -> Result<f64, EveApiError> {
        let raw = self.str(key)?;
        raw.trim().parse().map_err(|_| {
            EveApiError::Other(anyhow::anyhow!("attribute '{key}' is not a number: {raw}"))
        })
    }

    pub fn datetime(&self, key: &str) -> Result<Option<DateTime<Utc>>, EveApiError> {
        Ok(parse_eve_time(self.str(key)?))
    }
}
