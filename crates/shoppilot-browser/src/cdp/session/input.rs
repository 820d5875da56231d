//! Input (mouse and keyboard) operations for the CDP page session.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

impl PageSession {
    /// Click at viewport coordinates with the given button and click count.
    pub async fn click(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u8,
    ) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MousePressed,
                "x": x,
                "y": y,
                "button": button,
                "clickCount": click_count,
            })),
        )
        .await?;

        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseReleased,
                "x": x,
                "y": y,
                "button": button,
                "clickCount": click_count,
            })),
        )
        .await?;

        debug!("Clicked at ({}, {}) with {:?} x{}", x, y, button, click_count);
        Ok(())
    }

    /// Dispatch a wheel event at the given position.
    pub async fn wheel(&self, x: f64, y: f64, delta_x: f64, delta_y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseWheel,
                "x": x,
                "y": y,
                "deltaX": delta_x,
                "deltaY": delta_y,
            })),
        )
        .await?;
        Ok(())
    }

    /// Type text into the focused element, one character at a time with an
    /// inter-key delay. Per-character events exercise the page's input
    /// handlers the way a human would; bulk insertion races against
    /// autosuggest listeners on some storefronts.
    pub async fn type_text(&self, text: &str, key_delay: Duration) -> Result<(), CdpError> {
        for ch in text.chars() {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({
                    "type": KeyEventType::Char,
                    "text": ch.to_string(),
                })),
            )
            .await?;

            if !key_delay.is_zero() {
                tokio::time::sleep(key_delay).await;
            }
        }
        debug!("Typed {} characters", text.chars().count());
        Ok(())
    }

    /// Press a key (e.g. "Enter", "Delete").
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyDown,
                "key": key,
            })),
        )
        .await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": key,
            })),
        )
        .await?;

        Ok(())
    }

    /// Press a key combination (e.g. "Control+a").
    pub async fn press_key_combo(&self, combo: &str) -> Result<(), CdpError> {
        let parts: Vec<&str> = combo.split('+').collect();
        let modifiers = Self::get_modifiers(&parts[..parts.len() - 1]);
        let key = parts.last().unwrap_or(&"");

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyDown,
                "key": key,
                "modifiers": modifiers,
            })),
        )
        .await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": key,
                "modifiers": modifiers,
            })),
        )
        .await?;

        Ok(())
    }

    /// Get modifier flags from modifier names.
    pub(crate) fn get_modifiers(modifiers: &[&str]) -> i32 {
        let mut flags = 0;
        for m in modifiers {
            match m.to_lowercase().as_str() {
                "alt" => flags |= 1,
                "control" | "ctrl" => flags |= 2,
                "meta" | "command" | "cmd" => flags |= 4,
                "shift" => flags |= 8,
                _ => {}
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_modifiers() {
        assert_eq!(PageSession::get_modifiers(&["Control", "Shift"]), 10);
        assert_eq!(PageSession::get_modifiers(&["ctrl"]), 2);
        assert_eq!(PageSession::get_modifiers(&["Meta"]), 4);
        assert_eq!(PageSession::get_modifiers(&[]), 0);
        // Non-modifier names contribute nothing.
        assert_eq!(PageSession::get_modifiers(&["a"]), 0);
    }
}
