//! Advisory assistant for provider-side actions.
//!
//! Given a merchant and an intended action, produces human instructions
//! and a link to the provider's management page. Purely advisory: the
//! assistant never mutates subscription state; the engine's
//! `declare_intended_action` is the only state-mutating entry point after
//! an assistant interaction.

use async_trait::async_trait;

use crate::error::Result;

/// The provider-side action the user wants help with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Pause,
    Cancel,
    Renew,
    /// Skip one delivery/charge and continue (Subscribe & Save style).
    Skip,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Cancel => "cancel",
            Self::Renew => "renew",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instructions for carrying out an action at a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionGuide {
    pub merchant: String,
    pub action: ActionKind,
    /// Whether the steps are provider-specific or a generic fallback.
    pub known_provider: bool,
    pub steps: Vec<String>,
    /// Provider management page, when known.
    pub manage_url: Option<String>,
    /// Set when the user asked to pause a provider that only supports
    /// cancellation.
    pub pause_unsupported: bool,
}

/// Trait for assistant backends.
///
/// The production backend is a hosted function; [`StaticAssistant`] serves
/// the built-in provider table and works offline.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn guide(&self, merchant: &str, action: ActionKind) -> Result<ActionGuide>;
}

/// What we know about a provider's self-service options.
struct ProviderInfo {
    allows_pause: bool,
    cancel_steps: &'static [&'static str],
    pause_steps: &'static [&'static str],
    renew_steps: &'static [&'static str],
    url: &'static str,
}

fn provider_info(merchant: &str) -> Option<ProviderInfo> {
    match merchant.to_lowercase().as_str() {
        "netflix" => Some(ProviderInfo {
            allows_pause: false,
            cancel_steps: &[
                "Open Netflix app or visit netflix.com",
                "Go to Account settings",
                "Click 'Cancel Membership'",
                "Confirm cancellation",
                "You'll have access until the end of your billing period",
            ],
            pause_steps: &[],
            renew_steps: &[
                "Open Netflix app or visit netflix.com",
                "Go to Account settings",
                "Click 'Restart Membership'",
                "Choose your plan and confirm",
            ],
            url: "https://www.netflix.com/cancelplan",
        }),
        "spotify" => Some(ProviderInfo {
            allows_pause: true,
            cancel_steps: &[
                "Open Spotify app or visit spotify.com/account",
                "Click on 'Subscription' in the menu",
                "Select 'Cancel Premium'",
                "Follow the prompts to confirm",
                "Premium benefits end at the next billing date",
            ],
            pause_steps: &[
                "Open Spotify app or visit spotify.com/account",
                "Go to Subscription settings",
                "Select 'Pause my subscription'",
                "Choose how long to pause (1-3 months)",
                "Confirm your choice",
            ],
            renew_steps: &[
                "Open Spotify app or visit spotify.com/account",
                "Click on 'Subscription'",
                "Select 'Resume Premium'",
                "Confirm to restart your subscription",
            ],
            url: "https://www.spotify.com/account/subscription/",
        }),
        "amazon prime" => Some(ProviderInfo {
            allows_pause: false,
            cancel_steps: &[
                "Go to Amazon.in and sign in",
                "Navigate to 'Account & Lists' > 'Prime Membership'",
                "Click 'End Membership'",
                "Follow the cancellation flow",
                "Confirm your choice",
            ],
            pause_steps: &[],
            renew_steps: &[
                "Go to Amazon.in and sign in",
                "Navigate to 'Account & Lists' > 'Prime Membership'",
                "Click 'Restart Your Membership'",
                "Complete the payment process",
            ],
            url: "https://www.amazon.in/mc/manageyourmembership",
        }),
        "youtube" => Some(ProviderInfo {
            allows_pause: true,
            cancel_steps: &[
                "Open YouTube app or visit youtube.com",
                "Go to Settings > Purchases & memberships",
                "Select your YouTube Premium subscription",
                "Click 'Manage' then 'Cancel subscription'",
                "Confirm cancellation",
            ],
            pause_steps: &[
                "Open YouTube app or visit youtube.com",
                "Go to Settings > Purchases & memberships",
                "Select 'Pause membership'",
                "Choose duration and confirm",
            ],
            renew_steps: &[
                "Open YouTube app or visit youtube.com",
                "Go to Settings > Purchases & memberships",
                "Click 'Resume membership'",
                "Confirm to restart",
            ],
            url: "https://www.youtube.com/paid_memberships",
        }),
        _ => None,
    }
}

fn generic_steps(action: ActionKind) -> Vec<String> {
    let verb = match action {
        ActionKind::Cancel => "'Manage Subscription' or 'Cancel'",
        ActionKind::Renew => "'Renew' or 'Reactivate'",
        ActionKind::Pause | ActionKind::Skip => "Skip / Pause options",
    };
    vec![
        "Open the provider's app or website".to_string(),
        "Navigate to Billing or Subscription settings".to_string(),
        format!("Look for {verb}"),
        "Follow the flow and save any confirmation emails".to_string(),
    ]
}

/// Assistant backed by the built-in provider table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAssistant;

impl StaticAssistant {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AssistantClient for StaticAssistant {
    async fn guide(&self, merchant: &str, action: ActionKind) -> Result<ActionGuide> {
        let info = provider_info(merchant);

        let mut guide = ActionGuide {
            merchant: merchant.to_string(),
            action,
            known_provider: info.is_some(),
            steps: Vec::new(),
            manage_url: info.as_ref().map(|i| i.url.to_string()),
            pause_unsupported: false,
        };

        match info {
            Some(info) => {
                let steps: &[&str] = match action {
                    ActionKind::Cancel => info.cancel_steps,
                    ActionKind::Renew => info.renew_steps,
                    ActionKind::Pause | ActionKind::Skip => {
                        if info.allows_pause {
                            info.pause_steps
                        } else {
                            // Fall back to cancellation steps and flag it.
                            guide.pause_unsupported = true;
                            info.cancel_steps
                        }
                    }
                };
                guide.steps = steps.iter().map(|s| (*s).to_string()).collect();
                if guide.steps.is_empty() {
                    guide.known_provider = false;
                    guide.steps = generic_steps(action);
                }
            }
            None => {
                guide.steps = generic_steps(action);
            }
        }

        Ok(guide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_provider_cancel_steps() {
        let assistant = StaticAssistant::new();
        let guide = assistant.guide("Netflix", ActionKind::Cancel).await.unwrap();

        assert!(guide.known_provider);
        assert_eq!(guide.steps.len(), 5);
        assert_eq!(
            guide.manage_url.as_deref(),
            Some("https://www.netflix.com/cancelplan")
        );
        assert!(!guide.pause_unsupported);
    }

    #[tokio::test]
    async fn test_pause_unsupported_falls_back_to_cancel() {
        let assistant = StaticAssistant::new();
        let guide = assistant.guide("netflix", ActionKind::Pause).await.unwrap();

        assert!(guide.pause_unsupported);
        // The steps offered are the cancellation steps.
        assert!(guide.steps.iter().any(|s| s.contains("Cancel Membership")));
    }

    #[tokio::test]
    async fn test_pause_supported_provider() {
        let assistant = StaticAssistant::new();
        let guide = assistant.guide("Spotify", ActionKind::Pause).await.unwrap();

        assert!(!guide.pause_unsupported);
        assert!(guide.steps.iter().any(|s| s.contains("Pause my subscription")));
    }

    #[tokio::test]
    async fn test_unknown_provider_gets_generic_steps() {
        let assistant = StaticAssistant::new();
        let guide = assistant.guide("Gym Next Door", ActionKind::Cancel).await.unwrap();

        assert!(!guide.known_provider);
        assert!(guide.manage_url.is_none());
        assert_eq!(guide.steps.len(), 4);
    }
}
