//! User-facing text for the order dialog, per locale.

use serde::{Deserialize, Serialize};

/// Cup sizes offered by the size prompt.
pub const SIZE_OPTIONS: [&str; 3] = ["300ml", "500ml", "700ml"];

/// Language used for every message the bot sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt-BR")]
    Portuguese,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Self::English),
            "pt" | "pt-br" | "portuguese" => Ok(Self::Portuguese),
            other => Err(format!("unsupported locale {other:?} (expected en or pt-BR)")),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::English => write!(f, "en"),
            Self::Portuguese => write!(f, "pt-BR"),
        }
    }
}

/// Message catalog for one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn welcome(&self) -> &'static str {
        match self.locale {
            Locale::English => {
                "Welcome to the açaí shop! Send any message and I'll take your order."
            }
            Locale::Portuguese => {
                "Bem-vindo à loja de açaí! Envie qualquer mensagem e eu anoto seu pedido."
            }
        }
    }

    pub fn name_prompt(&self) -> &'static str {
        match self.locale {
            Locale::English => "What is your name?",
            Locale::Portuguese => "Qual o seu nome?",
        }
    }

    pub fn greeting(&self, name: &str) -> String {
        match self.locale {
            Locale::English => format!("Hello {name}! Shall we place your order?"),
            Locale::Portuguese => format!("Olá {name}! Vamos ao pedido?"),
        }
    }

    pub fn size_prompt(&self) -> String {
        let options = join_options(&SIZE_OPTIONS, self.or_word());
        match self.locale {
            Locale::English => format!("Which açaí size would you like? Options are: {options}"),
            Locale::Portuguese => {
                format!("Gostaria de um açaí de qual tamanho? Opções são: {options}")
            }
        }
    }

    pub fn size_retry(&self) -> String {
        let options = join_options(&SIZE_OPTIONS, self.or_word());
        match self.locale {
            Locale::English => format!("Please pick one of: {options}"),
            Locale::Portuguese => format!("Por favor, escolha uma das opções: {options}"),
        }
    }

    pub fn size_ack(&self, size: &str) -> String {
        match self.locale {
            Locale::English => format!("So you want a {size} açaí."),
            Locale::Portuguese => format!("Então quer um açaí de {size}."),
        }
    }

    pub fn age_consent_prompt(&self) -> &'static str {
        match self.locale {
            Locale::English => "Would you like to tell me your age?",
            Locale::Portuguese => "Gostaria de me informar sua idade?",
        }
    }

    pub fn age_prompt(&self) -> &'static str {
        match self.locale {
            Locale::English => "Please tell me your age.",
            Locale::Portuguese => "Por favor, me informe sua idade.",
        }
    }

    pub fn age_retry(&self) -> &'static str {
        match self.locale {
            Locale::English => "The value must be greater than 0 and less than 150.",
            Locale::Portuguese => "O valor inserido deve ser maior do que 0 e menor do que 150.",
        }
    }

    pub fn age_not_provided(&self) -> &'static str {
        match self.locale {
            Locale::English => "Age not provided.",
            Locale::Portuguese => "Idade não informada.",
        }
    }

    pub fn age_ack(&self, age: i64) -> String {
        match self.locale {
            Locale::English => format!("I have you down as {age} years old."),
            Locale::Portuguese => format!("Tenho aqui que você tem {age} anos de idade."),
        }
    }

    pub fn confirm_prompt(&self) -> &'static str {
        match self.locale {
            Locale::English => "Is this correct?",
            Locale::Portuguese => "Está certo?",
        }
    }

    /// Generic retry for yes/no prompts.
    pub fn confirm_retry(&self) -> String {
        let [yes, no] = self.confirm_choices();
        match self.locale {
            Locale::English => format!("Please answer {yes} or {no}."),
            Locale::Portuguese => format!("Por favor, responda {yes} ou {no}."),
        }
    }

    pub fn name_retry(&self) -> &'static str {
        match self.locale {
            Locale::English => "Sorry, I didn't catch that. What is your name?",
            Locale::Portuguese => "Desculpe, não entendi. Qual o seu nome?",
        }
    }

    pub fn summary(&self, name: &str, size: &str, age: Option<i64>) -> String {
        let mut msg = match self.locale {
            Locale::English => format!("I noted your açaí size as {size} and your name as {name}."),
            Locale::Portuguese => {
                format!("Marquei que seu açaí é de {size} e seu nome é {name}.")
            }
        };
        if let Some(age) = age {
            match self.locale {
                Locale::English => msg.push_str(&format!(" And you are {age} years old.")),
                Locale::Portuguese => msg.push_str(&format!(" E tem {age} anos de idade.")),
            }
        }
        msg
    }

    pub fn not_stored(&self) -> &'static str {
        match self.locale {
            Locale::English => "Thank you. Your profile will not be stored.",
            Locale::Portuguese => "Obrigado. Seu perfil não será armazenado.",
        }
    }

    pub fn turn_error(&self) -> [&'static str; 2] {
        match self.locale {
            Locale::English => [
                "The bot encountered an error or bug.",
                "To continue to run this bot, please fix the bot source code.",
            ],
            Locale::Portuguese => [
                "O BOT encontrou um erro ou um bug.",
                "Para continuar a executar este BOT, por favor corrija seu código fonte.",
            ],
        }
    }

    /// Button labels for yes/no prompts, yes first.
    pub fn confirm_choices(&self) -> [&'static str; 2] {
        match self.locale {
            Locale::English => ["yes", "no"],
            Locale::Portuguese => ["sim", "não"],
        }
    }

    fn or_word(&self) -> &'static str {
        match self.locale {
            Locale::English => "or",
            Locale::Portuguese => "ou",
        }
    }
}

/// "a, b or c"
fn join_options(options: &[&str], or_word: &str) -> String {
    match options {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} {or_word} {last}", init.join(", ")),
    }
}
