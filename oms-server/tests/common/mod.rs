//! Shared test harness: an on-disk store in a temp dir plus recording mocks
//! for every external capability.
#![allow(dead_code)]

use oms_server::OmsManager;
use oms_server::capabilities::{
    CapabilityError, CapabilityResult, CapabilitySet, CustomerDirectoryCapability,
    ExternalPaymentHandle, MarketingNotifyCapability, MerchantConfig, MerchantDirectoryCapability,
    NotificationSender, PaymentProviderCapability, PickupPointDirectoryCapability, PointInfo,
    SearchIndexCapability,
};
use oms_server::credit::{CreditLineApi, CreditLineProvider, CreditRegistry};
use oms_server::engine::receipts::PaymentProviderRegistry;
use oms_server::observers::ObserverRegistry;
use oms_server::store::EntityStore;
use shared::models::{
    CreditSystem, Order, Payment, PaymentReceipt, PaymentStatus, PaymentSystem, ReceiptType,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct RecordingSearch {
    pub calls: Mutex<Vec<u64>>,
}

impl SearchIndexCapability for RecordingSearch {
    fn mark_product_for_index_via_offer(&self, offer_id: u64) -> CapabilityResult<()> {
        self.calls.lock().unwrap().push(offer_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMarketing {
    pub calls: Mutex<Vec<(u64, PaymentStatus)>>,
}

impl MarketingNotifyCapability for RecordingMarketing {
    fn update_payment_status(
        &self,
        order_id: u64,
        payment_status: PaymentStatus,
    ) -> CapabilityResult<()> {
        self.calls.lock().unwrap().push((order_id, payment_status));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSms {
    pub messages: Mutex<Vec<(Vec<String>, String)>>,
}

impl NotificationSender for RecordingSms {
    fn send(&self, recipient_phones: &[String], message: &str) -> CapabilityResult<()> {
        self.messages
            .lock()
            .unwrap()
            .push((recipient_phones.to_vec(), message.to_string()));
        Ok(())
    }
}

pub struct StaticMerchants {
    pub requires_approval: bool,
    pub lookups: AtomicUsize,
}

impl StaticMerchants {
    pub fn new(requires_approval: bool) -> Self {
        Self {
            requires_approval,
            lookups: AtomicUsize::new(0),
        }
    }
}

impl MerchantDirectoryCapability for StaticMerchants {
    fn merchant_config(&self, _merchant_id: u64) -> CapabilityResult<MerchantConfig> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(MerchantConfig {
            requires_approval: self.requires_approval,
        })
    }
}

pub struct StaticPoints {
    pub point: Option<PointInfo>,
}

impl Default for StaticPoints {
    fn default() -> Self {
        Self {
            point: Some(PointInfo {
                address: "12 Harbor St".into(),
                timetable: "09:00-21:00".into(),
                phone: "+7 900 000-00-00".into(),
            }),
        }
    }
}

impl PickupPointDirectoryCapability for StaticPoints {
    fn lookup(&self, _point_id: u64) -> CapabilityResult<Option<PointInfo>> {
        Ok(self.point.clone())
    }
}

pub struct StaticCustomers {
    pub phone: Option<String>,
}

impl Default for StaticCustomers {
    fn default() -> Self {
        Self {
            phone: Some("+79990001122".into()),
        }
    }
}

impl CustomerDirectoryCapability for StaticCustomers {
    fn customer_phone(&self, _customer_id: u64) -> CapabilityResult<Option<String>> {
        Ok(self.phone.clone())
    }
}

#[derive(Default)]
pub struct MockPaymentProvider {
    pub income_calls: AtomicUsize,
    pub refund_all_calls: AtomicUsize,
    pub refunds: Mutex<Vec<f64>>,
    pub fail_income: AtomicBool,
}

impl PaymentProviderCapability for MockPaymentProvider {
    fn create_external_payment(
        &self,
        payment: &Payment,
        _return_url: &str,
    ) -> CapabilityResult<ExternalPaymentHandle> {
        Ok(ExternalPaymentHandle {
            external_id: format!("ext-{}", payment.id),
            handler_url: Some("https://gateway.test/pay".into()),
        })
    }

    fn payment_link(&self, payment: &Payment) -> CapabilityResult<String> {
        Ok(format!("https://gateway.test/pay/{}", payment.id))
    }

    fn duration_hours(&self) -> Option<i64> {
        Some(24)
    }

    fn create_income_receipt(
        &self,
        _order: &Order,
        payment: &Payment,
    ) -> CapabilityResult<PaymentReceipt> {
        if self.fail_income.load(Ordering::SeqCst) {
            return Err(CapabilityError::new("fiscal provider unavailable"));
        }
        self.income_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentReceipt::new(payment.id, ReceiptType::Income))
    }

    fn create_refund_all_receipt(
        &self,
        _order: &Order,
        payment: &Payment,
    ) -> CapabilityResult<PaymentReceipt> {
        self.refund_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentReceipt::new(payment.id, ReceiptType::Refund))
    }

    fn refund(&self, _order: &Order, amount: f64) -> CapabilityResult<()> {
        self.refunds.lock().unwrap().push(amount);
        Ok(())
    }
}

pub struct MockCreditApi;

impl CreditLineApi for MockCreditApi {
    fn order_status(&self, _order_number: &str) -> CapabilityResult<Option<String>> {
        Ok(Some("APPROVED".into()))
    }

    fn create_payment(
        &self,
        order_number: &str,
        _amount: f64,
        _receipt_type: &str,
    ) -> CapabilityResult<Option<String>> {
        Ok(Some(format!("credit-{order_number}")))
    }
}

pub struct TestHarness {
    pub manager: OmsManager,
    pub search: Arc<RecordingSearch>,
    pub marketing: Arc<RecordingMarketing>,
    pub sms: Arc<RecordingSms>,
    pub merchants: Arc<StaticMerchants>,
    pub provider: Arc<MockPaymentProvider>,
    _dir: tempfile::TempDir,
}

pub fn harness() -> TestHarness {
    harness_with(ObserverRegistry::standard(), true)
}

pub fn harness_with(registry: ObserverRegistry, requires_approval: bool) -> TestHarness {
    let dir = tempfile::TempDir::new().unwrap();
    let store = EntityStore::open(dir.path().join("oms.redb")).unwrap();

    let search = Arc::new(RecordingSearch::default());
    let marketing = Arc::new(RecordingMarketing::default());
    let sms = Arc::new(RecordingSms::default());
    let merchants = Arc::new(StaticMerchants::new(requires_approval));
    let provider = Arc::new(MockPaymentProvider::default());

    let caps = CapabilitySet {
        search: search.clone(),
        marketing: marketing.clone(),
        merchants: merchants.clone(),
        sms: sms.clone(),
        points: Arc::new(StaticPoints::default()),
        customers: Arc::new(StaticCustomers::default()),
    };

    let mut providers = PaymentProviderRegistry::new();
    providers.register(PaymentSystem::Yandex, provider.clone());
    providers.register(PaymentSystem::CreditLine, provider.clone());

    let mut credit = CreditRegistry::new();
    credit.register(
        CreditSystem::CreditLine,
        Arc::new(CreditLineProvider::new(MockCreditApi)),
    );

    let manager = OmsManager::new(store, registry, caps, providers, credit);

    TestHarness {
        manager,
        search,
        marketing,
        sms,
        merchants,
        provider,
        _dir: dir,
    }
}
