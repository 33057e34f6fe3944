// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::config::settings::RegistrySettings;
    use crate::engines::registry_extractor::{ExtractorSelectors, RegistryHtmlExtractor};
    use crate::engines::reqwest_engine::RegistryFetcher;
    use crate::engines::traits::{FetchError, PageFetcher};
    use std::sync::Arc;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIRST_PAGE: &str = r#"
        <html><body>
          <div class="search-result-count">23 företag</div>
          <div class="search-result">
            <h2><a href="/foretag/falu-plast-ab/falun/-/5561998484">Falu Plast AB</a></h2>
            <div class="location">791 77 Falun</div>
          </div>
          <a href="/search?what=plast&page=2">2</a>
          <a href="/search?what=plast&page=4">4</a>
        </body></html>
    "#;

    const SECOND_PAGE: &str = r#"
        <html><body>
          <div class="search-result">
            <h2><a href="/foretag/borlange-form-hb/borlange/-/9697123456">Borlänge Form HB</a></h2>
            <div class="location">784 33 Borlänge</div>
          </div>
        </body></html>
    "#;

    fn fetcher_for(server: &MockServer) -> RegistryFetcher {
        let extractor = RegistryHtmlExtractor::new(&ExtractorSelectors::default()).unwrap();
        let settings = RegistrySettings {
            base_url: server.uri(),
            ..RegistrySettings::default()
        };
        RegistryFetcher::new(&settings, Arc::new(extractor)).unwrap()
    }

    #[tokio::test]
    async fn test_first_page_reports_totals_and_uses_origin_referer() {
        let server = MockServer::start().await;
        let origin = format!("{}/", server.uri());
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "1"))
            .and(query_param("what", "plast"))
            .and(header("referer", origin.as_str()))
            .and(header_exists("accept-language"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIRST_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let first = fetcher_for(&server)
            .fetch_first_page(&format!("{}/search?what=plast", server.uri()))
            .await
            .unwrap();

        assert_eq!(first.total_companies, 23);
        assert_eq!(first.total_pages, 4);
        assert_eq!(first.companies.len(), 1);
        assert_eq!(first.companies[0].registry_id, "556199-8484");
    }

    #[tokio::test]
    async fn test_fetch_page_chains_referer() {
        let server = MockServer::start().await;
        let referer = format!("{}/search?what=plast&page=1", server.uri());
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "2"))
            .and(header("referer", referer.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(SECOND_PAGE))
            .mount(&server)
            .await;

        let companies = fetcher_for(&server)
            .fetch_page(&format!("{}/search?what=plast", server.uri()), 2, &referer)
            .await
            .unwrap();

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].city, "Borlänge");
        assert_eq!(companies[0].registry_id, "969712-3456");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = fetcher_for(&server)
            .fetch_page(&format!("{}/search", server.uri()), 3, &server.uri())
            .await;

        match result {
            Err(e @ FetchError::Status { .. }) => assert_eq!(e.status(), Some(503)),
            other => panic!("expected status error, got {:?}", other.map(|c| c.len())),
        }
    }

    #[tokio::test]
    async fn test_first_page_rejects_foreign_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIRST_PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let result = fetcher
            .fetch_first_page("https://other-registry.example/search?what=plast")
            .await;

        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
        assert_eq!(fetcher.name(), "reqwest");
    }
}
