// src/emails/templates.rs
use crate::common::{format_dollars, Cents};

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #1F2937; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
        .amount {{ font-size: 20px; font-weight: bold; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{}</h1>
        </div>
        <div class="content">
            {}
        </div>
        <div class="footer">
            <p>This is an automated message. Please do not reply directly to this email.</p>
        </div>
    </div>
</body>
</html>"#,
        title, body
    )
}

pub fn magic_link_email(magic_link_url: &str) -> String {
    layout(
        "Sign in",
        &format!(
            r#"<p>Click the button below to sign in and manage your donation.</p>
            <p><a class="button" href="{url}">Sign in</a></p>
            <p>This link expires in 15 minutes. If you did not request it, you can safely ignore this email.</p>
            <p>If the button does not work, copy this address into your browser:<br>{url}</p>"#,
            url = magic_link_url
        ),
    )
}

pub fn subscription_welcome_email(amount: Cents) -> String {
    layout(
        "Thank you!",
        &format!(
            r#"<p>Your monthly donation is set up.</p>
            <p class="amount">{} per month</p>
            <p>Your support keeps the doors open. You can change or cancel your donation at any time from the manage page.</p>"#,
            format_dollars(amount)
        ),
    )
}

pub fn subscription_canceled_email(amount: Option<Cents>) -> String {
    let amount_line = match amount {
        Some(amount) => format!(
            r#"<p class="amount">{} per month</p>"#,
            format_dollars(amount)
        ),
        None => String::new(),
    };
    layout(
        "Donation canceled",
        &format!(
            r#"<p>Your monthly donation has been canceled.</p>
            {}
            <p>Thank you for the support you have given. You are welcome back any time.</p>"#,
            amount_line
        ),
    )
}

pub fn subscription_past_due_email(amount: Option<Cents>) -> String {
    let amount_line = match amount {
        Some(amount) => format!(
            r#"<p class="amount">{} per month</p>"#,
            format_dollars(amount)
        ),
        None => String::new(),
    };
    layout(
        "Payment issue",
        &format!(
            r#"<p>We could not process the latest charge for your monthly donation.</p>
            {}
            <p>Please update your payment method from the manage page to keep your donation active.</p>"#,
            amount_line
        ),
    )
}

pub fn subscription_updated_email(old_amount: Cents, new_amount: Cents) -> String {
    layout(
        "Donation updated",
        &format!(
            r#"<p>Your monthly donation amount has changed.</p>
            <p class="amount">{} &rarr; {} per month</p>
            <p>The new amount takes effect on your next billing cycle.</p>"#,
            format_dollars(old_amount),
            format_dollars(new_amount)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_email_includes_formatted_amount() {
        let html = subscription_welcome_email(5000);
        assert!(html.contains("$50.00"));
    }

    #[test]
    fn updated_email_includes_both_amounts() {
        let html = subscription_updated_email(5000, 133700);
        assert!(html.contains("$50.00"));
        assert!(html.contains("$1,337.00"));
    }

    #[test]
    fn canceled_email_omits_amount_when_unknown() {
        let html = subscription_canceled_email(None);
        assert!(!html.contains("per month"));
        assert!(html.contains("has been canceled"));
    }

    #[test]
    fn magic_link_email_embeds_url() {
        let html = magic_link_email("http://localhost:3000/auth/email/callback?state=abc");
        assert!(html.contains("state=abc"));
    }
}
