// cyclocity API request/response bodies (manually entered)

#[derive(Debug, serde::Serialize, Clone, PartialEq, Eq)]
pub struct ClientTokenRequest {
    pub code: String,
    pub key: String,
}

#[allow(non_snake_case)]
#[derive(Debug, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct ClientTokens {
    pub accessToken: String,
    pub refreshToken: String,
}

#[allow(non_snake_case)]
#[derive(Debug, serde::Serialize, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub refreshToken: String,
}

/// Response of `/auth/access_tokens`. The endpoint also echoes a refresh token, which is ignored.
#[allow(non_snake_case)]
#[derive(Debug, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub accessToken: String,
}

/// OpenID-Connect style token set returned by `/identities/token`
#[derive(Debug, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct OAuthTokenSet {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub scope: String,
    pub id_token: String,
}

/// One completed rental. Prices are in minor currency units (cents), duration in minutes.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub movement_ref: String,
    pub subscription_id: String,
    pub subscription_ref: String,
    pub contract_name: String,
    pub account_id: String,
    pub status: String,
    pub bike_number: i64,
    pub start_date_time: String,
    pub start_station: i64,
    pub end_date_time: String,
    pub end_station: i64,
    pub start_stand: i64,
    pub end_stand: i64,
    pub duration: i64,
    pub rewards_earned: i64,
    pub rewards_spent: i64,
    pub price: i64,
    pub discount: i64,
    pub reduced_price: i64,
    pub litigious: bool,
    pub is_special: bool,
    pub is_rated: bool,
}

#[test]
fn test_trip_json() {
    let trip: Trip = serde_json::from_str(
        r#"{
            "id": "6b1f",
            "movementRef": "MV-1",
            "subscriptionId": "sub-9",
            "subscriptionRef": "ANNUAL",
            "contractName": "dublin",
            "accountId": "acc-1",
            "status": "CLOSED",
            "bikeNumber": 1043,
            "startDateTime": "2023-05-02T08:01:12Z",
            "startStation": 32,
            "endDateTime": "2023-05-02T08:19:40Z",
            "endStation": 5,
            "startStand": 12,
            "endStand": 3,
            "duration": 18,
            "rewardsEarned": 1,
            "rewardsSpent": 0,
            "price": 0,
            "discount": 0,
            "reducedPrice": 0,
            "litigious": false,
            "isSpecial": false,
            "isRated": true,
            "someNewField": "ignored"
        }"#,
    )
    .unwrap();
    assert_eq!(trip.movement_ref, "MV-1");
    assert_eq!(trip.bike_number, 1043);
    assert_eq!(trip.start_station, 32);
    assert_eq!(trip.end_station, 5);
    assert_eq!(trip.duration, 18);
    assert!(trip.is_rated);
    assert!(!trip.is_special);

    let out = serde_json::to_value(&trip).unwrap();
    assert_eq!(out["startDateTime"], "2023-05-02T08:01:12Z");
    assert_eq!(out["isRated"], true);

    // every field is required
    assert!(serde_json::from_str::<Trip>(r#"{"id": "6b1f", "duration": 18}"#).is_err());
    // wrong type
    assert!(serde_json::from_str::<Trip>(&out.to_string().replace("1043", "\"1043\"")).is_err());
}

#[test]
fn test_token_json() {
    let tokens: OAuthTokenSet = serde_json::from_str(
        r#"{"access_token": "A", "token_type": "T", "refresh_token": "B",
            "expires_in": 3600, "scope": "S", "id_token": "C"}"#,
    )
    .unwrap();
    assert_eq!(tokens.access_token, "A");
    assert_eq!(tokens.id_token, "C");
    assert_eq!(tokens.expires_in, 3600);

    let access: AccessToken =
        serde_json::from_str(r#"{"accessToken": "Z", "refreshToken": "R"}"#).unwrap();
    assert_eq!(access.accessToken, "Z");

    assert_eq!(
        serde_json::to_string(&RefreshRequest {
            refreshToken: "R".to_string()
        })
        .unwrap(),
        r#"{"refreshToken":"R"}"#
    );
}
