//! Source document retrieval and row mapping.
//!
//! Retrieval failures (network, HTTP status, unreadable body, bad selector)
//! are fatal for the run; row-level parse failures are returned inline so
//! one malformed row never drops the rest of the batch.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use kyukou_shared::config::Source;
use kyukou_shared::{Event, KyukouError, Result};

use crate::row::{RawRow, RowError, SourceContext, parse_row};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("kyukou/", env!("CARGO_PKG_VERSION"));

/// One row's outcome: an event candidate or an isolated parse error.
pub type RowResult = std::result::Result<Event, RowError>;

/// HTTP fetcher for announcement pages.
pub struct Scraper {
    client: Client,
}

impl Scraper {
    /// Create a scraper with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| KyukouError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `source`'s page and map every announcement row through the
    /// row parser. The first selector match is the header row and is
    /// skipped.
    #[instrument(skip_all, fields(source = %source.name, url = %source.url))]
    pub async fn scrape(&self, source: &Source) -> Result<Vec<RowResult>> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| KyukouError::Network(format!("{}: {e}", source.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KyukouError::Network(format!(
                "{}: HTTP {status}",
                source.url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| KyukouError::Network(format!("{}: body read failed: {e}", source.url)))?;

        let results = parse_document(&body, source)?;
        debug!(rows = results.len(), "mapped announcement rows");
        Ok(results)
    }
}

/// Select announcement rows in `html` and parse each one.
pub fn parse_document(html: &str, source: &Source) -> Result<Vec<RowResult>> {
    let row_selector = Selector::parse(&source.row_selector).map_err(|e| {
        KyukouError::parse(format!(
            "bad row selector `{}`: {e}",
            source.row_selector
        ))
    })?;
    let cell_selector = Selector::parse("td, th").unwrap();

    let ctx = SourceContext {
        link: &source.url,
        department: &source.department,
    };

    let doc = Html::parse_document(html);
    let mut results = Vec::new();

    for row_el in doc.select(&row_selector).skip(1) {
        let raw: String = row_el.text().collect();
        let cells: Vec<String> = row_el
            .select(&cell_selector)
            .map(|cell| cell.text().collect())
            .collect();

        results.push(parse_row(&RawRow { raw, cells }, &ctx));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body><div class="notices"><table>
        <tr><th>No</th><th>日時</th><th>科目</th><th>教員</th><th>掲示</th><th>種別</th><th>備考</th></tr>
        <tr>
          <td>1</td>
          <td>2099年10月3日金曜1・2限</td>
          <td>憲法U</td>
          <td>山田 太郎</td>
          <td>2099年10月1日 18時54分</td>
          <td>休講</td>
          <td></td>
        </tr>
        <tr>
          <td>2</td>
          <td>日程調整中</td>
          <td>民法演習</td>
          <td>佐藤</td>
          <td>2099年10月1日 19時00分</td>
          <td>休講</td>
          <td></td>
        </tr>
        <tr>
          <td>3</td>
          <td>2099年10月4日土曜3限</td>
          <td>刑法(補講)</td>
          <td>鈴木</td>
          <td>2099年10月2日 9時5分</td>
          <td>公務</td>
          <td>教室変更あり</td>
        </tr>
    </table></div></body></html>"#;

    fn test_source(url: String) -> Source {
        Source {
            name: "law".into(),
            url,
            department: "法学部".into(),
            row_selector: ".notices table tr".into(),
        }
    }

    #[test]
    fn parse_document_skips_header_and_isolates_bad_rows() {
        let source = test_source("http://example.ac.jp/keiji.cgi".into());
        let results = parse_document(PAGE, &source).expect("parse document");

        assert_eq!(results.len(), 3);

        let first = results[0].as_ref().expect("row 1 parses");
        assert_eq!(first.subject, "憲法II");
        assert_eq!(first.link, source.url);
        assert_eq!(first.event_date.day(), 3);

        let err = results[1].as_ref().expect_err("row 2 is malformed");
        assert!(err.raw.contains("日程調整中"));

        // the bad row did not prevent parsing of the row after it
        let third = results[2].as_ref().expect("row 3 parses");
        assert_eq!(third.about, "補講");
        assert_eq!(third.subject, "刑法");
        assert_eq!(third.note.as_deref(), Some("教室変更あり"));
    }

    #[test]
    fn parse_document_rejects_bad_selector() {
        let mut source = test_source("http://example.ac.jp/keiji.cgi".into());
        source.row_selector = ":::".into();
        let err = parse_document(PAGE, &source).unwrap_err();
        assert!(matches!(err, KyukouError::Parse { .. }));
    }

    #[tokio::test]
    async fn scrape_maps_rows_from_live_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keiji.cgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let source = test_source(format!("{}/keiji.cgi", server.uri()));
        let scraper = Scraper::new(Duration::from_secs(5)).unwrap();
        let results = scraper.scrape(&source).await.expect("scrape");

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn http_error_is_fatal_for_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keiji.cgi"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = test_source(format!("{}/keiji.cgi", server.uri()));
        let scraper = Scraper::new(Duration::from_secs(5)).unwrap();
        let err = scraper.scrape(&source).await.unwrap_err();
        assert!(matches!(err, KyukouError::Network(_)));
        assert!(err.to_string().contains("503"));
    }
}
