//! Scripted counterparty simulator
//!
//! A persona-driven, seeded stand-in for the language-model-backed debtor
//! simulator. It classifies the agent's utterance by template markers and
//! reacts from simple internal state: patience drains each turn, empathy
//! builds rapport and restores goodwill, repeated pressure builds
//! annoyance, and offer acceptance follows willingness and means. All
//! randomness comes from one ChaCha8 stream, so a given (persona, seed,
//! utterance sequence) always replays identically.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use collections_agent_core::{
    CounterpartyReply, CounterpartySimulator, Persona, Result, Signal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OfferKind {
    Plan,
    Settlement,
    Deferral,
    FullBalance,
}

/// Rule-based debtor simulation.
pub struct ScriptedCounterparty {
    persona: Persona,
    rng: ChaCha8Rng,
    patience: f64,
    rapport: f64,
    annoyance: f64,
    offers_heard: u32,
    agreed: bool,
    last_utterance: String,
}

impl ScriptedCounterparty {
    pub fn new(seed: u64) -> Self {
        let persona = Persona::default();
        Self {
            patience: persona.patience as f64,
            persona,
            rng: ChaCha8Rng::seed_from_u64(seed),
            rapport: 0.0,
            annoyance: 0.0,
            offers_heard: 0,
            agreed: false,
            last_utterance: String::new(),
        }
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    fn accept_probability(&self, offer: OfferKind) -> f64 {
        let base =
            (self.persona.willingness as f64 + self.persona.financial_situation as f64) / 30.0;
        let hardship = self.persona.financial_situation <= 3;
        let kind = match offer {
            OfferKind::Plan => {
                if hardship {
                    -0.10
                } else {
                    0.15
                }
            }
            OfferKind::Settlement => {
                if hardship {
                    0.20
                } else {
                    0.05
                }
            }
            OfferKind::Deferral => {
                if hardship {
                    0.30
                } else {
                    -0.05
                }
            }
            OfferKind::FullBalance => {
                if self.persona.financial_situation >= 8 {
                    0.0
                } else {
                    -0.25
                }
            }
        };
        (base + kind + 0.08 * self.rapport - 0.06 * self.annoyance).clamp(0.02, 0.95)
    }

    fn hot_tempered(&self) -> bool {
        self.persona.temperament >= 7
    }

    fn reply(
        &self,
        text: impl Into<String>,
        signal: Option<Signal>,
        should_hangup: bool,
    ) -> CounterpartyReply {
        CounterpartyReply {
            text: text.into(),
            should_hangup,
            detected_signal: signal,
            patience_remaining: self.patience.max(0.0).round() as u8,
        }
    }

    fn respond_to_offer(&mut self, offer: OfferKind) -> CounterpartyReply {
        self.offers_heard += 1;
        if self.offers_heard > 2 {
            self.annoyance += 0.5;
        }

        let p = self.accept_probability(offer);
        if self.chance(p) {
            self.agreed = true;
            self.rapport += 0.5;
            return self.reply(
                "Okay, yes, I can agree to that. That works for me.",
                Some(Signal::Agreement),
                false,
            );
        }

        if self.persona.financial_situation <= 3 && self.chance(0.6) {
            return self.reply(
                "I just can't. I lost my job and there's nothing left each month.",
                Some(Signal::Hardship),
                false,
            );
        }
        if self.hot_tempered() && self.offers_heard >= 2 && self.chance(0.5) {
            self.annoyance += 1.0;
            return self.reply(
                "Stop pushing me. This is ridiculous.",
                Some(Signal::Frustration),
                false,
            );
        }
        if self.chance(0.4) {
            self.annoyance += 0.5;
            return self.reply(
                "That amount is not right, and the terms are unfair.",
                Some(Signal::Objection),
                false,
            );
        }
        self.reply("No. I'm not agreeing to that.", Some(Signal::Refusal), false)
    }
}

#[async_trait]
impl CounterpartySimulator for ScriptedCounterparty {
    async fn respond(&mut self, agent_utterance: &str) -> Result<CounterpartyReply> {
        let utterance = agent_utterance.to_lowercase();

        // Repeating the exact same line grates.
        if !self.last_utterance.is_empty() && self.last_utterance == utterance {
            self.annoyance += 1.0;
        }
        self.last_utterance = utterance.clone();

        // Baseline patience drain, faster once annoyed.
        self.patience -= 1.0;
        if self.annoyance >= 2.0 {
            self.patience -= 0.5;
        }

        if self.patience <= 0.0 {
            // Hot-tempered debtors demand the calls stop; others just leave.
            if self.hot_tempered() && self.chance(0.4) {
                return Ok(self.reply(
                    "Stop calling me. Do not contact me again.",
                    Some(Signal::StopContact),
                    false,
                ));
            }
            return Ok(self.reply("I'm done with this call.", None, true));
        }

        // Empathy restores goodwill.
        if utterance.contains("i understand") || utterance.contains("sounds difficult") {
            self.rapport += 1.0;
            self.patience = (self.patience + 1.5).min(self.persona.patience as f64);
            if self.persona.willingness >= 5 && self.chance(0.5) {
                return Ok(self.reply(
                    "Thank you. I do want to sort this out, honestly.",
                    Some(Signal::WillingToPay),
                    false,
                ));
            }
            return Ok(self.reply("Thanks. It has been a rough stretch.", None, false));
        }

        if utterance.contains("let me address") {
            // Objection handled; tension eases.
            self.rapport += 0.7;
            self.annoyance = (self.annoyance - 1.0).max(0.0);
            return Ok(self.reply("Alright, that makes more sense.", None, false));
        }

        if utterance.contains("date of birth") || utterance.contains("confirm your identity") {
            let p = 0.55 + self.persona.willingness as f64 / 25.0 + 0.05 * self.rapport;
            if self.chance(p) {
                return Ok(self.reply(
                    "Yes, that's me. Go ahead.",
                    Some(Signal::Agreement),
                    false,
                ));
            }
            return Ok(self.reply(
                "I'm not comfortable confirming that over the phone.",
                Some(Signal::Refusal),
                false,
            ));
        }

        if utterance.contains("attempt to collect a debt") {
            return Ok(self.reply("Fine. Go on.", None, false));
        }

        if utterance.contains("outstanding balance") {
            // Well-informed debtors sometimes push back on the paperwork.
            if self.persona.knowledge >= 8 && self.chance(0.1) {
                return Ok(self.reply(
                    "I don't owe that. I dispute this debt and want validation in writing.",
                    Some(Signal::DisputesDebt),
                    false,
                ));
            }
            if self.hot_tempered() && self.chance(0.2) {
                self.annoyance += 1.0;
                return Ok(self.reply(
                    "You people keep harassing me about this.",
                    Some(Signal::Frustration),
                    false,
                ));
            }
            return Ok(self.reply("I know about the balance, yes.", None, false));
        }

        if utterance.contains("fallen behind") {
            if self.persona.financial_situation <= 4 {
                return Ok(self.reply(
                    "I've been out of work. Money has been very tight.",
                    Some(Signal::Hardship),
                    false,
                ));
            }
            if self.persona.willingness >= 6 && self.chance(0.4) {
                return Ok(self.reply(
                    "It slipped through the cracks. I'd like to get it settled.",
                    Some(Signal::WillingToPay),
                    false,
                ));
            }
            return Ok(self.reply("Things have just been busy.", None, false));
        }

        if utterance.contains("monthly payment plan") {
            return Ok(self.respond_to_offer(OfferKind::Plan));
        }
        if utterance.contains("settle the account") {
            return Ok(self.respond_to_offer(OfferKind::Settlement));
        }
        if utterance.contains("postpone") {
            return Ok(self.respond_to_offer(OfferKind::Deferral));
        }
        if utterance.contains("full balance today") {
            return Ok(self.respond_to_offer(OfferKind::FullBalance));
        }

        if utterance.contains("payment details") {
            if self.agreed {
                return Ok(self.reply(
                    "Sure, I'll use my debit card, it's ready.",
                    Some(Signal::Agreement),
                    false,
                ));
            }
            return Ok(self.reply(
                "Hold on, I haven't agreed to anything yet.",
                Some(Signal::Objection),
                false,
            ));
        }

        if utterance.contains("to confirm") {
            return Ok(self.reply("Yes, that's what we discussed.", Some(Signal::Agreement), false));
        }

        if utterance.contains("call you back") {
            return Ok(self.reply("Okay, call me then.", Some(Signal::Agreement), false));
        }

        if utterance.contains("supervisor") {
            return Ok(self.reply("Fine, put them on.", None, false));
        }

        if utterance.contains("hello") || utterance.contains("good day") {
            if self.hot_tempered() && self.chance(0.15) {
                self.annoyance += 1.0;
                return Ok(self.reply(
                    "Not this again. What do you want?",
                    Some(Signal::Frustration),
                    false,
                ));
            }
            return Ok(self.reply("Hello. Who is this?", None, false));
        }

        if self.chance(0.3) {
            return Ok(self.reply(
                "What exactly does that mean for me?",
                Some(Signal::AsksQuestion),
                false,
            ));
        }
        Ok(self.reply("Alright.", None, false))
    }

    fn reset(&mut self, persona: &Persona, seed: u64) {
        self.persona = persona.clone();
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.patience = persona.patience as f64;
        self.rapport = 0.0;
        self.annoyance = 0.0;
        self.offers_heard = 0;
        self.agreed = false;
        self.last_utterance.clear();
    }
}
