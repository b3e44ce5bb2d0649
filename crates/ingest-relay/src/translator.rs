// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::envelope::{CanonicalEnvelope, IncomingEnvelope};
use crate::normalizer::{AttributeEncoding, NormalizedFields};

/// Maps incoming envelopes to canonical ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    encoding: AttributeEncoding,
}

impl Translator {
    pub fn new(encoding: AttributeEncoding) -> Self {
        Translator { encoding }
    }

    pub fn encoding(&self) -> AttributeEncoding {
        self.encoding
    }

    /// Renames the scalar fields and normalizes the dynamic keys. Absent scalars become empty
    /// strings.
    pub fn translate(&self, incoming: &IncomingEnvelope) -> CanonicalEnvelope {
        let NormalizedFields { attributes, traits } = self.encoding.normalize(&incoming.dynamic);
        let field = |value: &Option<String>| value.clone().unwrap_or_default();

        CanonicalEnvelope {
            event: field(&incoming.event),
            event_type: field(&incoming.event_type),
            app_id: field(&incoming.app_id),
            user_id: field(&incoming.user_id),
            message_id: field(&incoming.message_id),
            page_title: field(&incoming.page_title),
            page_url: field(&incoming.page_url),
            browser_language: field(&incoming.browser_language),
            screen_size: field(&incoming.screen_size),
            attributes,
            traits,
        }
    }
}
