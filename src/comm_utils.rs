// comm_utils.rs
use crate::table_utils::TableBuilder;
use serde_json::{json, Value};
use std::error::Error;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio's API infrastructure.
pub struct Twilio;

impl Twilio {
    /// Sends an SMS/MMS message and returns the message SID.
    pub async fn send_message(
        body: &str,
        from_number: &str,
        to_number: &str,
        account_sid: &str,
        auth_token: &str,
        media_url: Option<&str>,
    ) -> Result<String, Box<dyn Error>> {
        Self::send_message_at(
            TWILIO_API_BASE,
            body,
            from_number,
            to_number,
            account_sid,
            auth_token,
            media_url,
        )
        .await
    }

    async fn send_message_at(
        base_url: &str,
        body: &str,
        from_number: &str,
        to_number: &str,
        account_sid: &str,
        auth_token: &str,
        media_url: Option<&str>,
    ) -> Result<String, Box<dyn Error>> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            base_url, account_sid
        );

        let mut form: Vec<(&str, &str)> = vec![
            ("Body", body),
            ("From", from_number),
            ("To", to_number),
        ];
        if let Some(media) = media_url {
            form.push(("MediaUrl", media));
        }

        let response = reqwest::Client::new()
            .post(&url)
            .basic_auth(account_sid, Some(auth_token))
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        let json: Value = response.json().await?;
        json["sid"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| "No sid in Twilio response".into())
    }

    /// Retrieves the account's message log as a table, following Twilio's page
    /// links until exhausted.
    pub async fn get_messages(
        account_sid: &str,
        auth_token: &str,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        Self::get_messages_at(TWILIO_API_BASE, account_sid, auth_token).await
    }

    async fn get_messages_at(
        base_url: &str,
        account_sid: &str,
        auth_token: &str,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let client = reqwest::Client::new();
        let mut page_uri = format!("/2010-04-01/Accounts/{}/Messages.json", account_sid);

        let mut rows: Vec<Vec<String>> = Vec::new();
        loop {
            let response = client
                .get(format!("{}{}", base_url, page_uri))
                .basic_auth(account_sid, Some(auth_token))
                .send()
                .await?
                .error_for_status()?;

            let json: Value = response.json().await?;
            rows.extend(Self::message_rows(&json));

            match json["next_page_uri"].as_str() {
                Some(next) if !next.is_empty() => page_uri = next.to_string(),
                _ => break,
            }
        }

        Ok(TableBuilder::from_raw_data(
            vec![
                "sent_time".to_string(),
                "sid".to_string(),
                "direction".to_string(),
                "msg".to_string(),
            ],
            rows,
        ))
    }

    /// Reshapes one page of a Twilio message-list response into rows.
    fn message_rows(page: &Value) -> Vec<Vec<String>> {
        page["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .map(|record| {
                        vec![
                            record["date_sent"].as_str().unwrap_or("").to_string(),
                            record["sid"].as_str().unwrap_or("").to_string(),
                            record["direction"].as_str().unwrap_or("").to_string(),
                            record["body"].as_str().unwrap_or("").to_string(),
                        ]
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Twilio's WhatsApp API infrastructure.
pub struct WhatsApp;

impl WhatsApp {
    /// Sends a WhatsApp message and returns the message SID. Numbers are given bare;
    /// the whatsapp address prefix is applied here.
    pub async fn send_message(
        body: &str,
        from_number: &str,
        to_number: &str,
        account_sid: &str,
        auth_token: &str,
        media_url: Option<&str>,
    ) -> Result<String, Box<dyn Error>> {
        Twilio::send_message(
            body,
            &format!("whatsapp:{}", from_number),
            &format!("whatsapp:{}", to_number),
            account_sid,
            auth_token,
            media_url,
        )
        .await
    }
}

/// SendGrid's API infrastructure.
pub struct SendGrid;

impl SendGrid {
    /// Builds the v3 mail-send payload.
    fn mail_payload(from_email: &str, to_emails: &[&str], subject: &str, html_content: &str) -> Value {
        json!({
            "personalizations": [{
                "to": to_emails.iter().map(|e| json!({"email": e})).collect::<Vec<Value>>()
            }],
            "from": {"email": from_email},
            "subject": subject,
            "content": [{"type": "text/html", "value": html_content}]
        })
    }

    /// Sends an email via the SendGrid v3 API, returning the response status code.
    pub async fn send_email(
        api_key: &str,
        from_email: &str,
        to_emails: &[&str],
        subject: &str,
        html_content: &str,
    ) -> Result<u16, Box<dyn Error>> {
        let payload = Self::mail_payload(from_email, to_emails, subject, html_content);

        let response = reqwest::Client::new()
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn send_message_posts_form_and_returns_sid() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/2010-04-01/Accounts/AC123/Messages.json")
                .body_contains("Body=hello")
                .body_contains("To=%2B15551234567");
            then.status(201)
                .header("Content-Type", "application/json")
                .body(r#"{"sid": "SM777", "status": "queued"}"#);
        });

        let sid = Twilio::send_message_at(
            &server.base_url(),
            "hello",
            "+15550000000",
            "+15551234567",
            "AC123",
            "token",
            None,
        )
        .await
        .unwrap();

        mock.assert();
        assert_eq!(sid, "SM777");
    }

    #[tokio::test]
    async fn get_messages_follows_pagination() {
        let server = MockServer::start();
        let page1 = server.mock(|when, then| {
            when.method(GET).path("/2010-04-01/Accounts/AC123/Messages.json");
            then.status(200)
                .header("Content-Type", "application/json")
                .body(
                    r#"{"messages": [{"sid": "SM1", "direction": "outbound-api",
                        "body": "first", "date_sent": "Mon, 01 Jan 2024 00:00:00 +0000"}],
                        "next_page_uri": "/2010-04-01/Accounts/AC123/Messages-page2.json"}"#,
                );
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/2010-04-01/Accounts/AC123/Messages-page2.json");
            then.status(200)
                .header("Content-Type", "application/json")
                .body(
                    r#"{"messages": [{"sid": "SM2", "direction": "inbound",
                        "body": "second", "date_sent": "Tue, 02 Jan 2024 00:00:00 +0000"}],
                        "next_page_uri": null}"#,
                );
        });

        let table = Twilio::get_messages_at(&server.base_url(), "AC123", "token")
            .await
            .unwrap();

        page1.assert();
        page2.assert();
        let rows = table.get_data().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "SM1");
        assert_eq!(rows[1][3], "second");
    }

    #[test]
    fn mail_payload_shapes_personalizations() {
        let payload = SendGrid::mail_payload(
            "from@example.com",
            &["a@example.com", "b@example.com"],
            "subj",
            "<b>hi</b>",
        );

        assert_eq!(payload["personalizations"][0]["to"][1]["email"], "b@example.com");
        assert_eq!(payload["content"][0]["type"], "text/html");
        assert_eq!(payload["from"]["email"], "from@example.com");
    }
}
