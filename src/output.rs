use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use anyhow::{Context, Result};

use crate::flatten::{Record, HEADER};

/// Append-only CSV output. Rows are flushed page by page so an aborted run
/// keeps everything fetched up to that point.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Open `path` for appending, writing the header only if the file is new
    /// or empty.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let is_empty = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", path.display()))?
            .len()
            == 0;

        Self::new(file, is_empty)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W, write_header: bool) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);

        if write_header {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self { writer })
    }

    pub fn append(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;

        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing csv output: {}", e.error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            author_id: "10".into(),
            tweet_id: "1".into(),
            created_at: "2021-01-01T00:00:00.000Z".into(),
            author_username: "alice".into(),
            tweet: "hi, \"there\"\nbye".into(),
            source: "Twitter Web App".into(),
            num_text_chars: 15,
            reply_to_tweet_id: None,
            reply_to_user_id: None,
            reply_to_screen_name: None,
            is_quote: false,
            is_retweet: true,
            reply_count: 2,
            retweet_count: 1,
            like_count: 3,
            quote_count: 4,
            lang: "en".into(),
        }
    }

    fn written(sink: CsvSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn header_matches_column_names() {
        let sink = CsvSink::new(Vec::new(), true).unwrap();
        assert_eq!(
            written(sink),
            "author id,tweet_id,created_at,author_username,tweet,source,num_text_chars,\
             reply_to_tweet_id,reply_to_user_id,reply_to_screen_name,is_quote,is_retweet,\
             reply_count,retweet_count,like_count,quote_count,lang\n"
        );
    }

    #[test]
    fn row_uses_upper_booleans_na_and_quoting() {
        let mut sink = CsvSink::new(Vec::new(), false).unwrap();
        sink.append(&[record()]).unwrap();

        assert_eq!(
            written(sink),
            "10,1,2021-01-01T00:00:00.000Z,alice,\"hi, \"\"there\"\"\nbye\",Twitter Web App,15,\
             NA,NA,NA,FALSE,TRUE,2,1,3,4,en\n"
        );
    }

    #[test]
    fn reply_fields_are_written_when_present() {
        let mut reply = record();
        reply.tweet = "@bob ok".into();
        reply.is_retweet = false;
        reply.reply_to_tweet_id = Some("T1".into());
        reply.reply_to_user_id = Some("U1".into());
        reply.reply_to_screen_name = Some("bob".into());

        let mut sink = CsvSink::new(Vec::new(), false).unwrap();
        sink.append(&[reply]).unwrap();

        let out = written(sink);
        assert!(out.contains(",T1,U1,bob,FALSE,FALSE,"), "{out}");
    }

    #[test]
    fn reopening_appends_without_second_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.csv");

        CsvSink::open(&path).unwrap().append(&[record()]).unwrap();
        CsvSink::open(&path).unwrap().append(&[record()]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut reader = csv::Reader::from_reader(contents.as_bytes());
        assert_eq!(reader.headers().unwrap().len(), HEADER.len());
        assert_eq!(reader.records().count(), 2);
        assert_eq!(contents.matches("author id").count(), 1);
    }
}
