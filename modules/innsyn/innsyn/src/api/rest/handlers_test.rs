#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::response::Response;
    use http::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
    use http::{Method, Request, StatusCode};
    use jsonwebtoken::Header;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::api::rest::routes::{HttpLimits, router};
    use crate::auth::{ClaimsError, KeyProvider};
    use crate::config::{InnsynConfig, Secret};
    use crate::domain::ports::PdlPerson;
    use crate::domain::testing::{FNR, Fakes, digisos_sak, lenker, pdf_bytes};
    use crate::domain::xsrf::XSRF_HEADER;
    use crate::state::AppState;

    const ID: &str = "sak-via-rest";

    struct FixedClaims;

    #[async_trait]
    impl KeyProvider for FixedClaims {
        async fn validate_and_decode(&self, _token: &str) -> Result<(Header, Value), ClaimsError> {
            let exp = chrono::Utc::now().timestamp() + 600;
            Ok((
                Header::default(),
                json!({"pid": FNR, "acr": "idporten-loa-high", "iss": "selvbetjening", "exp": exp}),
            ))
        }
    }

    fn app(fakes: &Fakes) -> Router {
        let mut cfg = InnsynConfig::default();
        cfg.fiks.dokumentlager_url = lenker().dokumentlager_url;
        cfg.fiks.svarut_url = lenker().svarut_url;
        cfg.xsrf.secret = Secret::new("xsrf-hemmelighet");
        let state = AppState::new(&fakes.ports(), Arc::new(FixedClaims), cfg);
        router(state, HttpLimits::default())
    }

    fn oppsett() -> Fakes {
        let fakes = Fakes::default();
        fakes.add_sak_med_hendelser(digisos_sak(ID), json!([]));
        fakes
    }

    fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(format!("/api/v1/innsyn{uri}"))
            .header(AUTHORIZATION, "Bearer token")
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn get(app: &Router, uri: &str) -> Response {
        send(app, request(Method::GET, uri).body(Body::empty()).unwrap()).await
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Fetches soknadsStatus and returns the XSRF token from its cookie.
    async fn xsrf_token(app: &Router) -> String {
        let res = get(app, &format!("/{ID}/soknadsStatus")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_owned();
        assert!(cookie.ends_with("; Path=/sosialhjelp/innsyn"));
        let (navn, rest) = cookie.split_once('=').unwrap();
        assert_eq!(navn, XSRF_HEADER);
        rest.split(';').next().unwrap().to_owned()
    }

    #[tokio::test]
    async fn probes_need_no_token() {
        let app = app(&oppsett());
        for uri in ["/internal/isAlive", "/internal/isReady"] {
            let res = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn missing_token_gives_login_url() {
        let app = app(&oppsett());
        let res = app
            .oneshot(Request::builder().uri("/api/v1/innsyn/saker").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(res).await;
        assert_eq!(body["id"], "azuread_authentication_error");
        assert_eq!(body["message"], "Autentiseringsfeil");
        assert!(body["loginUrl"].as_str().unwrap().starts_with("http"));
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let app = app(&oppsett());
        let res = get(&app, "/tilgang").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn soknads_status_is_camel_case_with_cookie() {
        let app = app(&oppsett());
        let res = get(&app, &format!("/{ID}/soknadsStatus")).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(SET_COOKIE));
        let body = json_body(res).await;
        assert_eq!(body["status"], "SENDT");
        assert_eq!(body["kommunenummer"], "0301");
        assert_eq!(body["navEksternRefId"], "11000001");
        assert!(body["soknadsalderIMinutter"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn empty_lists_are_no_content() {
        let app = app(&oppsett());
        assert_eq!(get(&app, &format!("/{ID}/saksStatus")).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(get(&app, &format!("/{ID}/vedlegg")).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unknown_sak_is_fiks_not_found() {
        let app = app(&oppsett());
        let res = get(&app, "/finnes-ikke/hendelser").await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["type"], "fiks_error");
    }

    #[tokio::test]
    async fn kode6_gets_403() {
        let fakes = oppsett();
        let person: PdlPerson =
            serde_json::from_value(json!({"adressebeskyttelse": [{"gradering": "STRENGT_FORTROLIG"}]})).unwrap();
        fakes.pdl.set_person(person);
        let app = app(&fakes);

        let res = get(&app, "/saker").await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(res).await["type"], "tilgang_error");

        let tilgang = json_body(get(&app, "/tilgang").await).await;
        assert_eq!(tilgang["harTilgang"], false);
    }

    #[tokio::test]
    async fn writes_without_xsrf_are_rejected() {
        let fakes = oppsett();
        let app = app(&fakes);

        let res = send(&app, request(Method::POST, &format!("/{ID}/klage")).body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["type"], "xsrf_error");

        let res = send(
            &app,
            request(Method::POST, &format!("/{ID}/klage"))
                .header(XSRF_HEADER, "feil")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn klage_can_be_drafted_and_sent() {
        let fakes = oppsett();
        let app = app(&fakes);
        let token = xsrf_token(&app).await;

        let res = send(
            &app,
            request(Method::POST, &format!("/{ID}/klage"))
                .header(XSRF_HEADER, &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let klage_id: Uuid = serde_json::from_value(json_body(res).await).unwrap();

        let input = json!({"fiksDigisosId": ID, "klageTekst": "Jeg er uenig", "vedtaksIds": ["vedtak-1"]});
        let res = send(
            &app,
            request(Method::PUT, &format!("/{ID}/klage/{klage_id}"))
                .header(XSRF_HEADER, &token)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(input.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let utkast = json_body(get(&app, &format!("/{ID}/klage/{klage_id}")).await).await;
        assert_eq!(utkast["klageTekst"], "Jeg er uenig");

        let res = send(
            &app,
            request(Method::POST, &format!("/{ID}/klage/send"))
                .header(XSRF_HEADER, &token)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"klageId": klage_id}).to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let sendt = fakes.klage.sendt();
        assert_eq!(sendt.len(), 1);
        assert_eq!(sendt[0].klage_id, klage_id);
        assert_eq!(sendt[0].vedtak_id, "vedtak-1");
        assert_eq!(get(&app, &format!("/{ID}/klage/{klage_id}")).await.status(), StatusCode::NOT_FOUND);
    }

    fn multipart(boundary: &str, deler: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (filnavn, content_type, data) in deler {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filnavn}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn vedlegg_upload_goes_to_fiks() {
        let fakes = oppsett();
        let app = app(&fakes);
        let token = xsrf_token(&app).await;
        let uuid = Uuid::new_v4();
        let metadata = json!([{
            "type": "lonnslipp",
            "tilleggsinfo": "arbeid",
            "hendelsetype": "dokumentasjonEtterspurt",
            "hendelsereferanse": "ref-1",
            "filer": [{"filnavn": "lonn.pdf", "uuid": uuid}]
        }])
        .to_string();
        let pdf = pdf_bytes();
        let fil = format!("{uuid}-lonn.pdf");
        let boundary = "innsyn-grense";
        let body = multipart(
            boundary,
            &[
                ("metadata.json", "application/json", metadata.as_bytes()),
                (&fil, "application/pdf", &pdf),
            ],
        );

        let res = send(
            &app,
            request(Method::POST, &format!("/{ID}/vedlegg"))
                .header(XSRF_HEADER, &token)
                .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body[0]["type"], "lonnslipp");
        assert_eq!(body[0]["filer"][0]["status"], "OK");
        assert_eq!(fakes.fiks.opplastinger().len(), 1);
    }

    #[tokio::test]
    async fn utbetalinger_month_defaults_and_parses() {
        let app = app(&oppsett());
        assert_eq!(get(&app, "/utbetalinger").await.status(), StatusCode::OK);
        assert_eq!(get(&app, "/utbetalinger?month=12").await.status(), StatusCode::OK);
        assert_eq!(get(&app, "/utbetalinger?month=mange").await.status(), StatusCode::BAD_REQUEST);
    }
}
