//! Atom XML serialization
//!
//! Emits standard Atom 1.0 (RFC 4287) without extensions. Feed-level `<id>` is
//! the feed link and entry `<id>` is the entry link.

use crate::feed::{FeedDocument, FeedItem};
use crate::output::traits::{OutputError, OutputResult};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Serializes a feed document to an Atom XML string
pub fn to_atom(document: &FeedDocument) -> OutputResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", ATOM_NS));
    emit(&mut writer, Event::Start(feed))?;

    write_text_element(&mut writer, "title", &document.title)?;
    write_text_element(&mut writer, "id", &document.link)?;
    write_text_element(&mut writer, "updated", &timestamp(document.updated_at()))?;
    if !document.description.is_empty() {
        write_text_element(&mut writer, "subtitle", &document.description)?;
    }
    if let Some(icon) = &document.icon {
        write_text_element(&mut writer, "icon", icon)?;
    }
    write_link(&mut writer, &document.link)?;
    write_author(&mut writer, &document.author)?;

    for item in &document.items {
        write_entry(&mut writer, item)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("feed")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    String::from_utf8(out).map_err(|e| OutputError::Format(e.to_string()))
}

fn write_entry<W: Write>(writer: &mut Writer<W>, item: &FeedItem) -> OutputResult<()> {
    let published = timestamp(item.published_at);

    emit(writer, Event::Start(BytesStart::new("entry")))?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "id", &item.link)?;
    write_text_element(writer, "updated", &published)?;
    write_text_element(writer, "published", &published)?;
    write_link(writer, &item.link)?;

    let mut summary = BytesStart::new("summary");
    summary.push_attribute(("type", "html"));
    emit(writer, Event::Start(summary))?;
    emit(writer, Event::Text(BytesText::new(&item.description)))?;
    emit(writer, Event::End(BytesEnd::new("summary")))?;

    if let Some(author) = item.author.as_deref().filter(|a| !a.is_empty()) {
        write_author(writer, author)?;
    }

    emit(writer, Event::End(BytesEnd::new("entry")))
}

fn write_link<W: Write>(writer: &mut Writer<W>, href: &str) -> OutputResult<()> {
    let mut link = BytesStart::new("link");
    link.push_attribute(("href", href));
    link.push_attribute(("rel", "alternate"));
    emit(writer, Event::Empty(link))
}

fn write_author<W: Write>(writer: &mut Writer<W>, name: &str) -> OutputResult<()> {
    emit(writer, Event::Start(BytesStart::new("author")))?;
    write_text_element(writer, "name", name)?;
    emit(writer, Event::End(BytesEnd::new("author")))
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> OutputResult<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> OutputResult<()> {
    writer
        .write_event(event)
        .map_err(|e| OutputError::Format(e.to_string()))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
