use dublinbikes::*;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Answers requests from a script, in order, and remembers what was sent.
#[derive(Default, Debug)]
struct FakeTransport {
    script: RefCell<VecDeque<Result<HttpResponse, String>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl FakeTransport {
    fn new(script: Vec<Result<HttpResponse, String>>) -> Self {
        FakeTransport {
            script: RefCell::new(script.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, response: HttpResponse) {
        self.script.borrow_mut().push_back(Ok(response));
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    fn paths(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        match self.script.borrow_mut().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(msg)) => Err(msg.into()),
            None => Err("no scripted response left".into()),
        }
    }
}

fn respond(status: StatusCode, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

fn ok_json(val: Value) -> HttpResponse {
    respond(StatusCode::OK, &val.to_string())
}

fn redirect(location: Option<&str>) -> HttpResponse {
    let mut resp = respond(StatusCode::FOUND, "");
    if let Some(loc) = location {
        resp.headers
            .insert(header::LOCATION, HeaderValue::from_str(loc).unwrap());
    }
    resp
}

fn client_tokens() -> HttpResponse {
    ok_json(json!({"accessToken": "client-access", "refreshToken": "client-refresh"}))
}

fn login_redirect() -> HttpResponse {
    redirect(Some(
        "https://www.dublinbikes.ie/openid_connect_login?code=XYZ&state=abc",
    ))
}

fn oauth_tokens() -> HttpResponse {
    ok_json(json!({
        "access_token": "A",
        "refresh_token": "B",
        "id_token": "C",
        "expires_in": 3600,
        "scope": "S",
        "token_type": "T",
    }))
}

fn access_token(token: &str) -> HttpResponse {
    ok_json(json!({ "accessToken": token }))
}

fn auth_script() -> Vec<Result<HttpResponse, String>> {
    vec![
        Ok(client_tokens()),
        Ok(login_redirect()),
        Ok(oauth_tokens()),
        Ok(access_token("fresh-1")),
    ]
}

fn credentials() -> Credentials {
    Credentials {
        account_id: "acc-42".parse().unwrap(),
        email: "rider+test@example.com".to_string(),
        password: "p@ss word&=".to_string(),
    }
}

fn connect(fake: &FakeTransport) -> Result<TripClient<&FakeTransport>> {
    TripClient::with_transport(fake, Config::default(), credentials())
}

fn query(req: &HttpRequest) -> HashMap<String, String> {
    req.url.query_pairs().into_owned().collect()
}

fn body_json(req: &HttpRequest) -> Value {
    serde_json::from_slice(req.body.as_ref().expect("request body")).unwrap()
}

fn trip_json(id: &str, start_station: i64) -> Value {
    json!({
        "id": id,
        "movementRef": format!("MV-{id}"),
        "subscriptionId": "sub-1",
        "subscriptionRef": "ANNUAL",
        "contractName": "dublin",
        "accountId": "acc-42",
        "status": "CLOSED",
        "bikeNumber": 1043,
        "startDateTime": "2023-05-02T08:01:12Z",
        "startStation": start_station,
        "endDateTime": "2023-05-02T08:19:40Z",
        "endStation": 5,
        "startStand": 12,
        "endStand": 3,
        "duration": 18,
        "rewardsEarned": 0,
        "rewardsSpent": 0,
        "price": 50,
        "discount": 0,
        "reducedPrice": 50,
        "litigious": false,
        "isSpecial": false,
        "isRated": false,
    })
}

#[test]
fn test_authentication_sequence() {
    let fake = FakeTransport::new(auth_script());
    let client = connect(&fake).unwrap();

    let session = client.session();
    assert_eq!(session.access_token(), "fresh-1");
    assert_eq!(session.id_token(), "C");
    assert_eq!(session.oauth_refresh_token(), "B");
    assert_eq!(session.client_refresh_token(), "client-refresh");
    assert_eq!(session.expires_in(), 3600);
    assert_eq!(session.scope(), "S");
    assert_eq!(session.token_type(), "T");

    assert_eq!(
        fake.paths(),
        vec![
            "/auth/environments/PRD/client_tokens",
            "/identities/users/login",
            "/identities/token",
            "/auth/access_tokens",
        ]
    );
    let reqs = fake.requests();
    assert!(reqs
        .iter()
        .all(|r| r.url.host_str() == Some("api.cyclocity.fr")));

    assert_eq!(reqs[0].method, Method::POST);
    assert_eq!(
        body_json(&reqs[0]),
        json!({"code": "vls.web.dublin:PRD", "key": config::DEFAULT_CLIENT_KEY})
    );
    assert_eq!(
        reqs[0].headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    assert_eq!(reqs[1].method, Method::GET);
    let login = query(&reqs[1]);
    assert_eq!(login["takn"], "client-access");
    assert_eq!(login["email"], "rider+test@example.com");
    assert_eq!(login["password"], "p@ss word&=");
    assert_eq!(
        login["redirect_uri"],
        "https://www.dublinbikes.ie/openid_connect_login"
    );

    assert_eq!(reqs[2].method, Method::POST);
    let exchange = query(&reqs[2]);
    assert_eq!(exchange["grant_type"], "authorization_code");
    assert_eq!(exchange["code"], "XYZ");
    assert_eq!(
        exchange["redirect_uri"],
        "https://www.dublinbikes.ie/openid_connect_login"
    );
    assert_eq!(
        reqs[2].headers.get(header::AUTHORIZATION).unwrap(),
        "Taknv1 client-access"
    );
    assert_eq!(reqs[2].body.as_deref(), Some(&b"{}"[..]));

    assert_eq!(reqs[3].method, Method::POST);
    assert_eq!(
        body_json(&reqs[3]),
        json!({"refreshToken": "client-refresh"})
    );
}

#[test]
fn test_authorization_code_is_url_decoded() {
    let mut script = auth_script();
    script[1] = Ok(redirect(Some(
        "https://www.dublinbikes.ie/openid_connect_login?state=1&code=a%2Bb%20c%3D",
    )));
    let fake = FakeTransport::new(script);
    connect(&fake).unwrap();
    assert_eq!(query(&fake.requests()[2])["code"], "a+b c=");
}

#[test]
fn test_refresh_uses_client_refresh_token() {
    let mut script = auth_script();
    script[3] = Ok(respond(StatusCode::INTERNAL_SERVER_ERROR, ""));
    let fake = FakeTransport::new(script);
    let err = connect(&fake).unwrap_err();
    assert_eq!(err.step(), Step::Refresh);
    assert_eq!(
        body_json(&fake.requests()[3]),
        json!({"refreshToken": "client-refresh"})
    );
}

#[test]
fn test_bad_status_stops_progression() {
    let failures = vec![
        (0, Step::ClientToken, respond(StatusCode::FORBIDDEN, "{}")),
        (1, Step::Login, respond(StatusCode::OK, "<html>login</html>")),
        (1, Step::Login, respond(StatusCode::SEE_OTHER, "")),
        (2, Step::TokenExchange, respond(StatusCode::UNAUTHORIZED, "")),
        (3, Step::Refresh, respond(StatusCode::BAD_REQUEST, "")),
    ];
    for (idx, step, response) in failures {
        let mut script = auth_script();
        let actual = response.status;
        script[idx] = Ok(response);
        let fake = FakeTransport::new(script);
        match connect(&fake) {
            Err(Error::UnexpectedStatus {
                step: err_step,
                actual: err_actual,
                ..
            }) => {
                assert_eq!(err_step, step);
                assert_eq!(err_actual, actual);
            }
            other => panic!("expected status error at {step}, got {:?}", other.err()),
        }
        assert_eq!(fake.requests().len(), idx + 1);
    }
}

#[test]
fn test_login_protocol_errors() {
    let mut script = auth_script();
    script[1] = Ok(redirect(None));
    let fake = FakeTransport::new(script);
    assert!(matches!(connect(&fake), Err(Error::MissingLocation)));
    assert_eq!(fake.requests().len(), 2);

    let mut script = auth_script();
    script[1] = Ok(redirect(Some(
        "https://www.dublinbikes.ie/openid_connect_login?error=access_denied",
    )));
    let fake = FakeTransport::new(script);
    assert!(matches!(connect(&fake), Err(Error::MissingCode)));
    assert_eq!(fake.requests().len(), 2);

    let mut script = auth_script();
    script[1] = Ok(redirect(Some("https://[broken")));
    let fake = FakeTransport::new(script);
    assert!(matches!(
        connect(&fake),
        Err(Error::InvalidLocation { .. })
    ));
}

#[test]
fn test_malformed_json_fails() {
    let bad = vec![
        (0, Step::ClientToken, respond(StatusCode::OK, "not json")),
        (
            2,
            Step::TokenExchange,
            ok_json(json!({"access_token": "A", "token_type": "T"})),
        ),
        (3, Step::Refresh, ok_json(json!({}))),
    ];
    for (idx, step, response) in bad {
        let mut script = auth_script();
        script[idx] = Ok(response);
        let fake = FakeTransport::new(script);
        match connect(&fake) {
            Err(Error::Decode { step: err_step, .. }) => assert_eq!(err_step, step),
            other => panic!("expected decode error at {step}, got {:?}", other.err()),
        }
        assert_eq!(fake.requests().len(), idx + 1);
    }

    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();
    fake.push(access_token("fresh-2"));
    fake.push(ok_json(json!([trip_json("1", 1), {"id": "2"}])));
    match client.fetch_trips() {
        Err(Error::Decode { step, .. }) => assert_eq!(step, Step::Trips),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn test_transport_error() {
    let fake = FakeTransport::new(vec![Err("connection refused".to_string())]);
    let err = connect(&fake).unwrap_err();
    assert_eq!(err.step(), Step::ClientToken);
    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_refresh_overwrites_access_token() {
    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();
    assert_eq!(client.session().access_token(), "fresh-1");

    fake.push(access_token("Z"));
    client.refresh_access_token().unwrap();
    assert_eq!(client.session().access_token(), "Z");
    assert_eq!(client.session().id_token(), "C");
}

#[test]
fn test_fetch_trips() {
    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();

    fake.push(access_token("fresh-2"));
    fake.push(ok_json(json!([
        trip_json("t3", 30),
        trip_json("t1", 10),
        trip_json("t2", 20),
    ])));
    let trips = client.fetch_trips().unwrap();
    assert_eq!(trips.len(), 3);
    assert_eq!(
        trips.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        vec!["t3", "t1", "t2"]
    );
    assert_eq!(trips[0].start_station, 30);
    assert_eq!(trips[1].movement_ref, "MV-t1");

    let reqs = fake.requests();
    assert_eq!(reqs.len(), 6);
    assert_eq!(reqs[4].url.path(), "/auth/access_tokens");
    let trips_req = &reqs[5];
    assert_eq!(trips_req.method, Method::GET);
    assert_eq!(
        trips_req.url.as_str(),
        "https://api.cyclocity.fr/contracts/dublin/accounts/acc-42/trips"
    );
    assert_eq!(trips_req.headers.get("identity").unwrap(), "C");
    assert_eq!(
        trips_req.headers.get(header::AUTHORIZATION).unwrap(),
        "Taknv1 fresh-2"
    );
    assert_eq!(
        trips_req.headers.get(header::ACCEPT).unwrap(),
        "application/json, text/plain, */*"
    );
}

#[test]
fn test_fetch_trips_empty() {
    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();
    fake.push(access_token("fresh-2"));
    fake.push(ok_json(json!([])));
    assert!(client.fetch_trips().unwrap().is_empty());
}

#[test]
fn test_fetch_trips_refreshes_every_time() {
    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();
    for token in ["r1", "r2"] {
        fake.push(access_token(token));
        fake.push(ok_json(json!([trip_json("t1", 1)])));
        client.fetch_trips().unwrap();
        let reqs = fake.requests();
        assert_eq!(
            reqs.last().unwrap().headers.get(header::AUTHORIZATION).unwrap(),
            format!("Taknv1 {token}").as_str()
        );
    }
    assert_eq!(
        fake.paths()[4..],
        [
            "/auth/access_tokens",
            "/contracts/dublin/accounts/acc-42/trips",
            "/auth/access_tokens",
            "/contracts/dublin/accounts/acc-42/trips",
        ]
    );
}

#[test]
fn test_fetch_trips_failures() {
    // refresh failure: the trips endpoint is never called
    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();
    fake.push(respond(StatusCode::UNAUTHORIZED, ""));
    let err = client.fetch_trips().unwrap_err();
    assert_eq!(err.step(), Step::Refresh);
    assert_eq!(fake.requests().len(), 5);

    let fake = FakeTransport::new(auth_script());
    let mut client = connect(&fake).unwrap();
    fake.push(access_token("fresh-2"));
    fake.push(respond(StatusCode::INTERNAL_SERVER_ERROR, "oops"));
    match client.fetch_trips() {
        Err(Error::UnexpectedStatus { step, actual, .. }) => {
            assert_eq!(step, Step::Trips);
            assert_eq!(actual, StatusCode::INTERNAL_SERVER_ERROR);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn test_custom_config() {
    let config = Config {
        api_base: "http://localhost:8080/".to_string(),
        contract: "lyon".to_string(),
        client_code: "vls.web.lyon:PRD".to_string(),
        redirect_uri: "https://example.test/callback".to_string(),
        ..Default::default()
    };
    let fake = FakeTransport::new(auth_script());
    let mut client = TripClient::with_transport(&fake, config, credentials()).unwrap();
    fake.push(access_token("fresh-2"));
    fake.push(ok_json(json!([])));
    client.fetch_trips().unwrap();

    let reqs = fake.requests();
    assert_eq!(body_json(&reqs[0])["code"], "vls.web.lyon:PRD");
    assert_eq!(query(&reqs[1])["redirect_uri"], "https://example.test/callback");
    assert_eq!(
        reqs[5].url.as_str(),
        "http://localhost:8080/contracts/lyon/accounts/acc-42/trips"
    );
}

#[test]
fn test_trips_url_segments() {
    let config = Config {
        api_base: "https://bikes.example.test/api/".to_string(),
        contract: "san sebastian/x".to_string(),
        ..Default::default()
    };
    let credentials = Credentials {
        account_id: "a.b_c:1".parse().unwrap(),
        ..credentials()
    };
    let fake = FakeTransport::new(auth_script());
    let mut client = TripClient::with_transport(&fake, config, credentials).unwrap();
    fake.push(access_token("fresh-2"));
    fake.push(ok_json(json!([])));
    client.fetch_trips().unwrap();

    assert_eq!(
        fake.requests()[5].url.as_str(),
        "https://bikes.example.test/api/contracts/san%20sebastian%2Fx/accounts/a.b_c:1/trips"
    );
}
