//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// ```text
/// Basket ──► New ──► Confirmed ──► Assembled ──► Sent ──► Delivered
///             │          │             │           │
///             └──────────┴─────────────┴───────────┴──► Canceled
/// ```
///
/// `Basket` is the pre-checkout pseudo-state; only checkout leaves it.
/// `Delivered` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    #[default]
    Basket,
    New,
    Confirmed,
    Assembled,
    Sent,
    Delivered,
    Canceled,
}

/// Why [`OrderState::transition`] refused a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRejection {
    /// The order is delivered or canceled; nothing follows.
    AlreadyTerminal,

    /// The target is not the next fulfillment step and not a legal
    /// cancellation.
    NotAdjacent,
}

impl std::fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionRejection::AlreadyTerminal => f.write_str("order is already in a terminal state"),
            TransitionRejection::NotAdjacent => f.write_str("target state is not adjacent"),
        }
    }
}

impl OrderState {
    pub const ALL: [OrderState; 7] = [
        OrderState::Basket,
        OrderState::New,
        OrderState::Confirmed,
        OrderState::Assembled,
        OrderState::Sent,
        OrderState::Delivered,
        OrderState::Canceled,
    ];

    /// The only legality check for state changes.
    ///
    /// Allows the next forward step, or cancellation from any placed,
    /// non-terminal state. Returns the target on success.
    pub fn transition(self, to: OrderState) -> Result<OrderState, TransitionRejection> {
        if self.is_terminal() {
            return Err(TransitionRejection::AlreadyTerminal);
        }

        let legal = match to {
            OrderState::Canceled => self != OrderState::Basket,
            _ => self.successor() == Some(to),
        };

        if legal {
            Ok(to)
        } else {
            Err(TransitionRejection::NotAdjacent)
        }
    }

    /// Next step of forward fulfillment.
    pub fn successor(self) -> Option<OrderState> {
        match self {
            OrderState::Basket => Some(OrderState::New),
            OrderState::New => Some(OrderState::Confirmed),
            OrderState::Confirmed => Some(OrderState::Assembled),
            OrderState::Assembled => Some(OrderState::Sent),
            OrderState::Sent => Some(OrderState::Delivered),
            OrderState::Delivered | OrderState::Canceled => None,
        }
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Canceled)
    }

    /// True for states whose stock is held by a reservation.
    pub fn holds_stock(&self) -> bool {
        !matches!(
            self,
            OrderState::Basket | OrderState::Delivered | OrderState::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Basket => "basket",
            OrderState::New => "new",
            OrderState::Confirmed => "confirmed",
            OrderState::Assembled => "assembled",
            OrderState::Sent => "sent",
            OrderState::Delivered => "delivered",
            OrderState::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown order state: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use OrderState::*;

    #[test]
    fn default_state_is_basket() {
        assert_eq!(OrderState::default(), Basket);
    }

    #[test]
    fn forward_steps_are_legal() {
        assert_eq!(Basket.transition(New), Ok(New));
        assert_eq!(New.transition(Confirmed), Ok(Confirmed));
        assert_eq!(Confirmed.transition(Assembled), Ok(Assembled));
        assert_eq!(Assembled.transition(Sent), Ok(Sent));
        assert_eq!(Sent.transition(Delivered), Ok(Delivered));
    }

    #[test]
    fn jumps_and_backward_moves_are_not_adjacent() {
        assert_eq!(
            New.transition(Assembled),
            Err(TransitionRejection::NotAdjacent)
        );
        assert_eq!(
            Sent.transition(Confirmed),
            Err(TransitionRejection::NotAdjacent)
        );
        assert_eq!(New.transition(New), Err(TransitionRejection::NotAdjacent));
        assert_eq!(
            New.transition(Basket),
            Err(TransitionRejection::NotAdjacent)
        );
    }

    #[test]
    fn cancel_is_legal_from_every_placed_non_terminal_state() {
        for from in [New, Confirmed, Assembled, Sent] {
            assert_eq!(from.transition(Canceled), Ok(Canceled), "from {from}");
        }
        assert_eq!(
            Basket.transition(Canceled),
            Err(TransitionRejection::NotAdjacent)
        );
    }

    #[test]
    fn terminal_states_reject_everything() {
        for to in OrderState::ALL {
            assert_eq!(
                Delivered.transition(to),
                Err(TransitionRejection::AlreadyTerminal)
            );
            assert_eq!(
                Canceled.transition(to),
                Err(TransitionRejection::AlreadyTerminal)
            );
        }
    }

    #[test]
    fn only_placed_live_orders_hold_stock() {
        let holding: Vec<_> = OrderState::ALL
            .into_iter()
            .filter(|s| s.holds_stock())
            .collect();
        assert_eq!(holding, [New, Confirmed, Assembled, Sent]);
    }

    #[test]
    fn display_and_parse() {
        for state in OrderState::ALL {
            assert_eq!(state.to_string().parse::<OrderState>(), Ok(state));
        }
        assert!("shipped".parse::<OrderState>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Assembled).unwrap(), "\"assembled\"");
    }
}
