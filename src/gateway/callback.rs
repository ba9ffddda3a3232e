/// Fields of the provider push notification we log. Anything else is ignored.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallbackNotification {
    pub server_correlation_id: Option<String>,
    pub transaction_status: Option<String>,
    pub transaction_reference: Option<String>,
    pub request_date: Option<String>,
}
