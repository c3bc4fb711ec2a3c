use super::*;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Endpoint the page reports subscriptions to
pub const SUBSCRIPTION_PATH: &str = "/subscription";

/// Whether a reported subscription was just created or found from a previous visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    New,
    Old,
}

impl SubscriptionStatus {
    pub fn as_query(&self) -> &'static str {
        match self {
            SubscriptionStatus::New => "new",
            SubscriptionStatus::Old => "old",
        }
    }

    pub fn from_query(query: &str) -> Option<Self> {
        match query {
            "new" => Some(Self::New),
            "old" => Some(Self::Old),
            _ => None,
        }
    }

    fn log_mode(&self) -> &'static str {
        match self {
            SubscriptionStatus::New => "New subscription created",
            SubscriptionStatus::Old => "Old subscription found",
        }
    }
}

/// Decodes a VAPID public key, accepting both url-safe and standard alphabets with optional padding
pub fn url_base64_to_bytes(key: &str) -> Result<Vec<u8>> {
    let normalized = key
        .trim()
        .trim_end_matches('=')
        .replace('+', "-")
        .replace('/', "_");
    Ok(URL_SAFE_NO_PAD.decode(normalized)?)
}

impl PageSession {
    /// Reuses the existing subscription or creates one, then mirrors it to the server
    pub async fn setup_push(&self) -> Result {
        let registration = self.platform.container.ready().await?;
        let push = registration.push_manager();
        match push.get_subscription().await? {
            Some(subscription) => {
                *self.push_subscription.borrow_mut() = Some(subscription.clone());
                self.report_subscription(&subscription, SubscriptionStatus::Old)
                    .await
            }
            None => self.subscribe(push.as_ref()).await,
        }
    }

    async fn subscribe(&self, push: &dyn PushManager) -> Result {
        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: url_base64_to_bytes(&self.config.vapid_public_key)?,
        };
        let subscription = push.subscribe(options).await?;
        *self.push_subscription.borrow_mut() = Some(subscription.clone());
        self.report_subscription(&subscription, SubscriptionStatus::New)
            .await
    }

    async fn report_subscription(
        &self,
        subscription: &PushSubscription,
        status: SubscriptionStatus,
    ) -> Result {
        let body = serde_json::to_vec(subscription)?;
        let request = http::Request::post(format!("{SUBSCRIPTION_PATH}?{}", status.as_query()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))?;
        let response = self.platform.network.fetch(request).await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "subscription report was rejected");
        }
        info!(
            mode = status.log_mode(),
            vapid_public_key = %self.config.vapid_public_key,
            subscription = %subscription.0,
            "subscription reported"
        );
        OK
    }
}
