include!("integration_tests_setup.rs");

use std::str::FromStr;

use hyper::header::ContentType;
use hyper::{Method, Request, StatusCode, Uri};
use serde_json::Value;

fn call(context: &mut Context, method: Method, path: &str, body: Option<(ContentType, String)>) -> (StatusCode, String) {
    let url = Uri::from_str(&format!("{}{}", context.base_url, path)).unwrap();
    let mut req = Request::new(method, url);
    if let Some((content_type, body)) = body {
        req.headers_mut().set(content_type);
        req.set_body(body);
    }
    context
        .core
        .run(context.client.request(req).and_then(|resp| {
            let status = resp.status();
            read_body(resp.body()).map(move |body| (status, body))
        })).unwrap()
}

fn json_body(value: Value) -> Option<(ContentType, String)> {
    Some((ContentType::json(), value.to_string()))
}

fn form_body(body: &str) -> Option<(ContentType, String)> {
    Some((
        ContentType("application/x-www-form-urlencoded".parse().unwrap()),
        body.to_string(),
    ))
}

fn encode(code: &str) -> String {
    code.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'0'..=b'9' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        }).collect()
}

#[test]
fn coupon_lifecycle() {
    let mut context = setup();

    // generate
    let (status, body) = call(
        &mut context,
        Method::Post,
        "/coupons/generate",
        json_body(json!({"batch_size": 3, "reward": 250})),
    );
    assert_eq!(status, StatusCode::Ok);
    let coupons: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(coupons.len(), 3);
    let codes = coupons
        .iter()
        .map(|coupon| coupon["code"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();

    // links for every fresh coupon
    let (_, body) = call(&mut context, Method::Get, "/tracking/links", None);
    let links: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(links.len(), 3);

    // redeem the first one twice
    let form = format!(
        "couponCode={}&name=Asha&phone=98765+43210&email=asha%40example.com",
        encode(&codes[0].to_lowercase())
    );
    let (status, body) = call(&mut context, Method::Post, "/redeem", form_body(&form));
    assert_eq!(status, StatusCode::Ok);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["message"], json!("Coupon redeemed successfully!"));

    let (status, body) = call(&mut context, Method::Post, "/redeem", form_body(&form));
    assert_eq!(status, StatusCode::Ok);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], json!(false));
    assert_eq!(
        result["message"],
        json!("This coupon has already been used and cannot be redeemed again.")
    );

    // soft delete the second one, the used one can not be deleted
    let (status, _) = call(&mut context, Method::Delete, &format!("/coupons/{}", encode(&codes[1])), None);
    assert_eq!(status, StatusCode::Ok);
    let (status, _) = call(&mut context, Method::Delete, &format!("/coupons/{}", encode(&codes[0])), None);
    assert_eq!(status, StatusCode::BadRequest);

    // a deleted coupon reads as an invalid code
    let (_, body) = call(
        &mut context,
        Method::Post,
        "/redeem",
        json_body(json!({"couponCode": codes[1], "name": "Ravi", "phone": "9876543210", "email": "r@b.com"})),
    );
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["message"], json!("Invalid coupon code. Please check and try again."));

    // QR preview of the remaining one
    let (_, body) = call(&mut context, Method::Get, &format!("/redeem?code={}", encode(&codes[2])), None);
    let preview: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(preview["valid"], json!(true));

    let (_, body) = call(&mut context, Method::Get, "/tracking/statistics", None);
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(stats["total"], json!(2));
    assert_eq!(stats["used"], json!(1));
    assert_eq!(stats["unused"], json!(1));

    let (_, body) = call(&mut context, Method::Get, "/tracking/claims", None);
    let claims: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(claims.len(), 1);

    let (status, csv) = call(&mut context, Method::Get, "/tracking/export", None);
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("asha@example.com"));
}

#[test]
fn invalid_form_reports_first_error() {
    let mut context = setup();
    let (status, body) = call(
        &mut context,
        Method::Post,
        "/redeem",
        json_body(json!({"couponCode": "ABCDEFGH", "name": "", "phone": "1", "email": "bad"})),
    );
    assert_eq!(status, StatusCode::Ok);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], json!(false));
    assert_eq!(result["message"], json!("Please enter your name"));
}

#[test]
fn oversized_batch_is_rejected() {
    let mut context = setup();
    let (status, _) = call(
        &mut context,
        Method::Post,
        "/coupons/generate",
        json_body(json!({"batch_size": 501})),
    );
    assert_eq!(status, StatusCode::BadRequest);
}
