use axum::http::{Method, header::InvalidHeaderValue};

use crate::gateway::{
    MvolaGateway, PreparedRequest, Result, auth, correlation,
    payin::{MERCHANT_PAY_PATH, RequestBuilder},
};

impl<'a> RequestBuilder<'a> {
    /// `GET .../status/{serverCorrelationId}`
    pub fn status(
        &self,
        server_correlation_id: &str,
    ) -> std::result::Result<PreparedRequest<'a>, InvalidHeaderValue> {
        self.lookup(format!(
            "{}{}/status/{}",
            self.config.api_url, MERCHANT_PAY_PATH, server_correlation_id
        ))
    }

    /// `GET .../{transactionId}`
    pub fn details(
        &self,
        transaction_id: &str,
    ) -> std::result::Result<PreparedRequest<'a>, InvalidHeaderValue> {
        self.lookup(format!(
            "{}{}/{}",
            self.config.api_url, MERCHANT_PAY_PATH, transaction_id
        ))
    }

    fn lookup(
        &self,
        url: String,
    ) -> std::result::Result<PreparedRequest<'a>, InvalidHeaderValue> {
        let correlation_id = correlation::next_correlation_id();
        let headers = auth::provider_headers(self.config, self.token, &correlation_id)?;
        Ok(PreparedRequest {
            method: Method::GET,
            url,
            headers,
            correlation_id,
            body: None,
        })
    }
}

impl MvolaGateway {
    pub async fn status(&self, server_correlation_id: &str) -> Result<serde_json::Value> {
        let token = self.acquire_token().await?;
        let request = RequestBuilder::new(&self.config, &token).status(server_correlation_id)?;
        self.dispatch(request, "status").await
    }

    pub async fn details(&self, transaction_id: &str) -> Result<serde_json::Value> {
        let token = self.acquire_token().await?;
        let request = RequestBuilder::new(&self.config, &token).details(transaction_id)?;
        self.dispatch(request, "details").await
    }
}
