//! Topology Sinks
//!
//! [`JsonLinesSink`] writes every node, relation and measurement as one
//! JSON object per line, tagged with its record kind.

use crate::domain::ports::{GraphNode, GraphRelation, Measurement, TopologySink};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    Node(&'a GraphNode),
    Relation(&'a GraphRelation),
    Measurement(&'a Measurement),
}

/// Newline-delimited JSON sink over any writer
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &Record<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write + Send> TopologySink for JsonLinesSink<W> {
    fn node(&mut self, node: &GraphNode) -> Result<()> {
        self.write_record(&Record::Node(node))
    }

    fn relation(&mut self, relation: &GraphRelation) -> Result<()> {
        self.write_record(&Record::Relation(relation))
    }

    fn measurement(&mut self, measurement: &Measurement) -> Result<()> {
        self.write_record(&Record::Measurement(measurement))
    }
}
