use super::OutgoingEmail;

/// Content for the "verify your email address" message.
pub struct VerificationEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl VerificationEmail {
    pub fn new(link: &str, ttl_hours: i64) -> Self {
        Self {
            subject: "Verify your email address".to_string(),
            text: Self::text_template(link, ttl_hours),
            html: Self::html_template(link, ttl_hours),
        }
    }

    pub fn to(self, address: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: address.to_string(),
            subject: self.subject,
            text: self.text,
            html: self.html,
        }
    }

    fn text_template(link: &str, ttl_hours: i64) -> String {
        format!(
            r#"Verify your email address

Open the link below to verify your email address:

{link}

This link will expire in {ttl_hours} hours.

If you didn't request this verification, please ignore this email."#
        )
    }

    fn html_template(link: &str, ttl_hours: i64) -> String {
        format!(
            r#"<h1>Verify your email address</h1>
<p>Click the link below to verify your email address:</p>
<a href="{link}">{link}</a>
<p>This link will expire in {ttl_hours} hours.</p>
<p>If you didn't request this verification, please ignore this email.</p>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://notes.example.com/verify-email?token=abc123";

    #[test]
    fn subject_is_fixed() {
        assert_eq!(VerificationEmail::new(LINK, 24).subject, "Verify your email address");
    }

    #[test]
    fn both_bodies_carry_link_and_expiry() {
        let content = VerificationEmail::new(LINK, 24);
        assert!(content.text.contains(LINK));
        assert!(content.text.contains("24 hours"));
        assert!(content.html.contains(&format!(r#"<a href="{LINK}">"#)));
        assert!(content.html.contains("24 hours"));
    }

    #[test]
    fn to_sets_recipient() {
        let email = VerificationEmail::new(LINK, 24).to("a@x.com");
        assert_eq!(email.to, "a@x.com");
        assert_eq!(email.subject, "Verify your email address");
    }
}
