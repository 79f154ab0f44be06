//! Bearer-credential types and the expiry-aware in-process cache.

// self
use crate::_prelude::*;

/// Opaque bearer token wrapper keeping the secret out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// A bearer token together with its absolute expiry instant.
///
/// Never persisted; lost on process restart and reacquired on demand.
#[derive(Clone, Debug)]
pub struct Credential {
	/// Bearer token value.
	pub token: AccessToken,
	/// Absolute expiry instant reported by the provider.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Safety margin subtracted from the provider expiry to absorb clock skew and transit time.
	pub const SAFETY_MARGIN: Duration = Duration::seconds(60);

	/// Creates a credential from a token and its absolute expiry.
	pub fn new(token: AccessToken, expires_at: OffsetDateTime) -> Self {
		Self { token, expires_at }
	}

	/// Returns `true` while the credential is usable at the provided instant.
	pub fn usable_at(&self, instant: OffsetDateTime) -> bool {
		instant + Self::SAFETY_MARGIN < self.expires_at
	}
}

/// Last-write-wins cache holding the current provider credential.
///
/// Shared across concurrent requests. Two callers observing an expired slot may both
/// acquire a fresh token and both store it; the provider's token endpoint is idempotent and
/// cheap, so the duplicate exchange is accepted instead of serializing callers behind a lock.
#[derive(Debug, Default)]
pub struct CredentialCache(RwLock<Option<Credential>>);
impl CredentialCache {
	/// Returns the cached credential while it is usable beyond the safety margin.
	pub fn get(&self) -> Option<Credential> {
		self.get_at(OffsetDateTime::now_utc())
	}

	/// Clock-explicit variant of [`get`](Self::get).
	pub fn get_at(&self, instant: OffsetDateTime) -> Option<Credential> {
		self.0.read().clone().filter(|credential| credential.usable_at(instant))
	}

	/// Overwrites the cached credential unconditionally.
	pub fn store(&self, credential: Credential) {
		*self.0.write() = Some(credential);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn credential(expires_at: OffsetDateTime) -> Credential {
		Credential::new(AccessToken::new("token"), expires_at)
	}

	#[test]
	fn token_formatters_redact() {
		let token = AccessToken::new("super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
	}

	#[test]
	fn usability_honors_the_safety_margin() {
		let now = datetime!(2025-01-01 12:00 UTC);

		assert!(!credential(now).usable_at(now));
		assert!(!credential(now + Duration::seconds(60)).usable_at(now));
		assert!(credential(now + Duration::seconds(61)).usable_at(now));
	}

	#[test]
	fn cache_returns_only_usable_credentials() {
		let cache = CredentialCache::default();
		let now = datetime!(2025-01-01 12:00 UTC);

		assert!(cache.get_at(now).is_none());

		cache.store(credential(now + Duration::seconds(30)));

		assert!(cache.get_at(now).is_none(), "Tokens inside the margin must read as absent.");

		cache.store(credential(now + Duration::hours(1)));

		let cached = cache.get_at(now).expect("A fresh token should be returned.");

		assert_eq!(cached.token.expose(), "token");
	}

	#[test]
	fn store_overwrites_unconditionally() {
		let cache = CredentialCache::default();
		let now = datetime!(2025-01-01 12:00 UTC);

		cache.store(Credential::new(AccessToken::new("first"), now + Duration::hours(1)));
		cache.store(Credential::new(AccessToken::new("second"), now + Duration::minutes(5)));

		let cached = cache.get_at(now).expect("The replacement token should be returned.");

		assert_eq!(cached.token.expose(), "second");
	}
}
