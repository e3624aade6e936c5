use super::commit::push_header;
use super::parse_utils::{header, split_headers};
use super::{Id, Kind, Signature};

/// An annotated tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    object: Id,
    target_kind: Kind,
    name: String,
    tagger: Option<Signature>,
    message: String,
}

impl Tag {
    pub fn new(
        object: Id,
        target_kind: Kind,
        name: &str,
        tagger: Option<Signature>,
        message: &str,
    ) -> Tag {
        Tag {
            object,
            target_kind,
            name: name.to_string(),
            tagger,
            message: message.to_string(),
        }
    }

    /// ID of the tagged object.
    pub fn object(&self) -> &Id {
        &self.object
    }

    pub fn target_kind(&self) -> Kind {
        self.target_kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> Option<&Signature> {
        self.tagger.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(128 + self.message.len());

        push_header(&mut body, "object", &self.object.to_string());
        push_header(&mut body, "type", self.target_kind.as_str());
        push_header(&mut body, "tag", &self.name);
        if let Some(tagger) = &self.tagger {
            push_header(&mut body, "tagger", &tagger.to_string());
        }

        body.push(b'\n');
        body.extend_from_slice(self.message.as_bytes());
        body
    }

    pub(crate) fn parse(body: &[u8]) -> Result<Tag, String> {
        let (lines, message) = split_headers(body);
        let mut lines = lines.into_iter();

        let object = lines
            .next()
            .and_then(|line| header(line, b"object"))
            .ok_or("missing object header")?;
        let object = Id::from_hex(object).map_err(|e| format!("bad object ID: {}", e))?;

        let target_kind = lines
            .next()
            .and_then(|line| header(line, b"type"))
            .and_then(Kind::from_bytes)
            .ok_or("missing or unknown type header")?;

        let name = lines
            .next()
            .and_then(|line| header(line, b"tag"))
            .ok_or("missing tag header")?;
        let name = String::from_utf8(name.to_vec()).map_err(|_| "tag name is not UTF-8")?;

        let tagger = match lines.next() {
            Some(line) => Some(
                header(line, b"tagger")
                    .and_then(Signature::parse)
                    .ok_or("malformed tagger")?,
            ),
            None => None,
        };

        if lines.next().is_some() {
            return Err("unexpected header after tagger".to_string());
        }

        let message =
            String::from_utf8(message.to_vec()).map_err(|_| "tag message is not UTF-8")?;

        Ok(Tag {
            object,
            target_kind,
            name,
            tagger,
            message,
        })
    }
}
