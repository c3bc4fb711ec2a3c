use super::*;

pub const NOTIFICATION_TITLE: &str = "Some Notification";
/// Page opened when a notification is clicked and no window is around
pub const OPEN_WINDOW_URL: &str = "/";

impl AppWorker {
    /// Closes the notification and brings the app forward: the first focusable window gets
    /// the action and focus, otherwise a new window is opened and gets the action once ready.
    pub async fn notification_click(&self, action: &str, notification: &dyn Notification) -> Result {
        notification.close();
        info!("notificationclick: {action}");

        let clients = &self.platform.clients;
        let windows = clients
            .match_all(ClientQuery {
                include_uncontrolled: true,
                windows_only: true,
            })
            .await?;
        debug!("clients: {}", windows.len());

        if let Some(client) = windows.iter().find(|c| c.can_focus()) {
            client.post_message(&ClientMessage::notification(action, MessageKind::Focused))?;
            return client.focus().await;
        }

        if clients.can_open_window() {
            if let Some(client) = clients.open_window(OPEN_WINDOW_URL).await? {
                client.post_message(&ClientMessage::notification(action, MessageKind::Opened))?;
            }
        }
        OK
    }

    /// Forwards the payload to every open client. Displaying it is up to the page.
    pub async fn push(&self, payload: &str) -> Result {
        info!("push received: {payload}");
        let message = ClientMessage::push(payload);
        for client in self.platform.clients.match_all(ClientQuery::default()).await? {
            client.post_message(&message)?;
        }
        OK
    }

    /// Shows a local notification with the message text as body
    pub async fn message(&self, text: &str) -> Result {
        let options = notification_options(text, chrono::Utc::now().timestamp_millis());
        self.platform
            .scope
            .show_notification(NOTIFICATION_TITLE, &options)
            .await
    }
}

pub(crate) fn notification_options(body: &str, date_of_arrival: i64) -> NotificationOptions {
    NotificationOptions {
        body: body.to_owned(),
        vibrate: vec![100, 50, 100],
        data: NotificationData {
            date_of_arrival,
            primary_key: 1,
        },
        actions: vec![
            NotificationAction::new("doit", "Do this!", "images/checkmark.png"),
            NotificationAction::new("close", "Close notification", "images/xmark.png"),
        ],
    }
}
